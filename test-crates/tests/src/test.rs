pub mod wasms;

#[cfg(test)]
pub mod tests {
    use crate::wasms::counter;
    use crate::wasms::TestWasm;
    use corundum_wasmer_host::prelude::*;
    use rand::prelude::*;
    use std::io::Write;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    #[ctor::ctor]
    fn before() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn identity_round_trip() {
        let runtime = TestWasm::Identity.runtime();

        let submission = runtime.submit("foo").unwrap();

        assert_eq!(submission.output, "foo");
        assert!(submission.elapsed_ms() >= 0.0);
        assert_eq!(counter(&runtime, "alloc_calls"), 1);
        assert_eq!(counter(&runtime, "solve_calls"), 1);
        assert_eq!(counter(&runtime, "free_calls"), 2);
        assert_eq!(counter(&runtime, "freed_bytes"), 6);
        assert_eq!(counter(&runtime, "last_alloc_len"), 3);
        assert_eq!(counter(&runtime, "live"), 0);
    }

    #[test]
    fn alloc_is_sized_in_bytes_not_chars() {
        let runtime = TestWasm::Identity.runtime();
        let input = "héllo wörld ✨";

        assert_eq!(runtime.submit(input).unwrap().output, input);
        assert_eq!(counter(&runtime, "last_alloc_len"), input.len() as i32);
    }

    #[test]
    fn empty_input() {
        let runtime = TestWasm::Identity.runtime();

        assert_eq!(runtime.submit("").unwrap().output, "");
        assert_eq!(counter(&runtime, "last_alloc_len"), 0);
        assert_eq!(counter(&runtime, "solve_calls"), 1);
        assert_eq!(counter(&runtime, "free_calls"), 2);
        assert_eq!(counter(&runtime, "live"), 0);
    }

    #[test]
    fn random_round_trips() {
        let runtime = TestWasm::Identity.runtime();
        let mut rng = thread_rng();
        let rounds = 50;

        for _ in 0..rounds {
            let len = rng.gen_range(0..256);
            let input: String = (0..len).map(|_| rng.gen::<char>()).collect();
            assert_eq!(runtime.submit(&input).unwrap().output, input);
        }

        assert_eq!(counter(&runtime, "alloc_calls"), rounds);
        assert_eq!(counter(&runtime, "free_calls"), 2 * rounds);
        assert_eq!(counter(&runtime, "live"), 0);
    }

    #[test]
    fn big_input_grows_guest_memory() {
        let runtime = TestWasm::Identity.runtime();
        let input = "╰▐ ✖ 〜 ✖ ▐╯".repeat(10_000);

        assert_eq!(runtime.submit(&input).unwrap().output, input);
        assert!(runtime.with_guest(|guest| guest.memory_size()) > 2 * input.len() as u64);
        assert_eq!(counter(&runtime, "live"), 0);

        // the arena was reset so the next request starts from the bottom of the heap again
        assert_eq!(runtime.submit("small").unwrap().output, "small");
    }

    #[cfg(rust_guests)]
    #[test]
    fn rust_guest_round_trip() {
        let runtime = TestWasm::Reverse.runtime();

        assert_eq!(runtime.submit("foo ✖ bar").unwrap().output, "rab ✖ oof");
        assert_eq!(runtime.submit("╰▐ 〜").unwrap().output, "〜 ▐╰");
        // alloc(0) hands out a dangling but non-zero address, free(ptr, 0) takes it back
        assert_eq!(runtime.submit("").unwrap().output, "");

        let mut rng = thread_rng();
        for _ in 0..50 {
            let len = rng.gen_range(0..256);
            let input: String = (0..len).map(|_| rng.gen::<char>()).collect();
            let reversed: String = input.chars().rev().collect();
            assert_eq!(runtime.submit(&input).unwrap().output, reversed);
        }
        assert!(!runtime.is_poisoned());
    }

    #[cfg(rust_guests)]
    #[test]
    fn rust_guest_frees_both_buffers() {
        let runtime = TestWasm::Reverse.runtime();
        let input = "╰▐ ✖ 〜 ✖ ▐╯".repeat(40_000);
        let reversed: String = input.chars().rev().collect();

        // let the guest allocator settle before measuring
        for _ in 0..3 {
            assert_eq!(runtime.submit(&input).unwrap().output, reversed);
        }
        let settled = runtime.with_guest(|guest| guest.memory_size());

        for _ in 0..20 {
            assert_eq!(runtime.submit(&input).unwrap().output, reversed);
        }
        // leaking either buffer would add over 2MiB per request
        let after = runtime.with_guest(|guest| guest.memory_size());
        assert!(
            after < settled + 4 * 1024 * 1024,
            "guest memory grew from {settled} to {after}"
        );
    }

    #[cfg(rust_guests)]
    #[test]
    fn rust_guest_alloc_failure_is_sentinel() {
        let runtime = TestWasm::Reverse.runtime();

        // more than a wasm32 allocator can ever reserve
        assert_eq!(runtime.with_guest(|guest| guest.alloc(u32::MAX)), Ok(0));
        assert_eq!(runtime.submit("ok").unwrap().output, "ko");
    }

    #[test]
    fn alloc_sentinel_is_out_of_memory() {
        let runtime = TestWasm::faulty("alloc_oom", "solve");

        let err = runtime.submit("foo").unwrap_err();

        assert_eq!(
            err.error,
            WasmErrorInner::Allocation {
                len: 3,
                cause: AllocationFailure::OutOfMemory
            }
        );
        assert_eq!(counter(&runtime, "solve_calls"), 0);
        assert_eq!(counter(&runtime, "free_calls"), 0);
        // refusing memory is not a fault, the guest can still be asked again
        assert!(!runtime.is_poisoned());
        assert_eq!(
            runtime.submit("foo").unwrap_err().kind(),
            ErrorKind::Allocation
        );
        assert_eq!(counter(&runtime, "alloc_calls"), 2);
    }

    #[test]
    fn empty_input_at_sentinel_is_not_out_of_memory() {
        let runtime = TestWasm::faulty("alloc_oom", "solve");

        assert_eq!(runtime.submit("").unwrap().output, "done");
        assert_eq!(counter(&runtime, "solve_calls"), 1);
        assert_eq!(counter(&runtime, "free_calls"), 2);
    }

    #[test]
    fn alloc_trap_poisons() {
        let runtime = TestWasm::faulty("alloc_trap", "solve");

        let err = runtime.submit("foo").unwrap_err();

        assert!(matches!(
            err.error,
            WasmErrorInner::Allocation {
                len: 3,
                cause: AllocationFailure::Trap(_)
            }
        ));
        assert_eq!(counter(&runtime, "solve_calls"), 0);
        assert_eq!(counter(&runtime, "free_calls"), 0);
        assert!(runtime.is_poisoned());
        assert_eq!(
            runtime.submit("foo").unwrap_err().error,
            WasmErrorInner::Poisoned
        );
        assert_eq!(counter(&runtime, "alloc_calls"), 1);
    }

    #[test]
    fn solve_trap_poisons_without_freeing() {
        let runtime = TestWasm::faulty("alloc", "solve_trap");

        let err = runtime.submit("foo").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::GuestTrap);
        assert_eq!(counter(&runtime, "alloc_calls"), 1);
        assert_eq!(counter(&runtime, "solve_calls"), 1);
        assert_eq!(counter(&runtime, "free_calls"), 0);
        assert!(runtime.is_poisoned());
        assert_eq!(runtime.submit("foo").unwrap_err().kind(), ErrorKind::Poisoned);
        assert_eq!(counter(&runtime, "solve_calls"), 1);
    }

    #[test]
    fn poison_is_readable_while_guest_is_held() {
        let runtime = TestWasm::faulty("alloc", "solve_trap");

        assert!(!runtime.with_guest(|_| runtime.is_poisoned()));
        assert!(runtime.submit("foo").is_err());
        assert!(runtime.with_guest(|_| runtime.is_poisoned()));
    }

    #[test]
    fn invalid_utf8_output() {
        let runtime = TestWasm::faulty("alloc", "solve_invalid_utf8");

        let err = runtime.submit("foo").unwrap_err();

        assert_eq!(
            err.error,
            WasmErrorInner::Decoding {
                buffer: GuestBuffer::new(16, 4),
                valid_up_to: 2
            }
        );
        // both buffers are still handed back
        assert_eq!(counter(&runtime, "free_calls"), 2);
        assert!(!runtime.is_poisoned());
    }

    #[test]
    fn output_past_guest_memory() {
        let runtime = TestWasm::faulty("alloc", "solve_past_memory");

        let err = runtime.submit("foo").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(counter(&runtime, "free_calls"), 2);
    }

    #[test]
    fn output_past_address_space() {
        let runtime = TestWasm::faulty("alloc", "solve_past_address_space");

        let err = runtime.submit("foo").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Protocol);
        // there is no sane output region to free, only the input goes back
        assert_eq!(counter(&runtime, "free_calls"), 1);
    }

    #[test]
    fn free_trap_poisons() {
        let runtime = TestWasm::Faulty.runtime_with(GuestConfig {
            free_export: "free_trap".into(),
            ..Default::default()
        });

        let err = runtime.submit("foo").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::GuestTrap);
        // the first failed free stops the release
        assert_eq!(counter(&runtime, "free_calls"), 1);
        assert!(runtime.is_poisoned());
    }

    #[test]
    fn metering_stops_runaway_guest() {
        let runtime = TestWasm::Faulty.runtime_with(
            GuestConfig {
                solve_export: "solve_loop".into(),
                ..Default::default()
            }
            .with_metering_limit(Some(1_000_000)),
        );

        let err = runtime.submit("foo").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::GuestTrap);
        assert!(runtime.is_poisoned());
    }

    #[test]
    fn metering_budget_is_per_request() {
        let runtime = TestWasm::Identity
            .runtime_with(GuestConfig::default().with_metering_limit(Some(1_000_000)));
        let input = ".".repeat(1_000);

        // each request alone fits the budget, together they would not
        for _ in 0..200 {
            assert_eq!(runtime.submit(&input).unwrap().output, input);
        }
    }

    #[test]
    fn configurable_sentinel() {
        let runtime = TestWasm::Faulty.runtime_with(
            GuestConfig {
                alloc_export: "alloc_oom".into(),
                ..Default::default()
            }
            .with_alloc_failure_sentinel(u32::MAX),
        );

        // 0 is an ordinary address once another sentinel is configured
        assert_eq!(runtime.submit("foo").unwrap().output, "done");
        assert_eq!(counter(&runtime, "free_calls"), 2);
    }

    #[test]
    fn try_submit_while_busy() {
        let runtime = Arc::new(TestWasm::Identity.runtime());
        let (held_tx, held_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let runtime = Arc::clone(&runtime);
            thread::spawn(move || {
                runtime.with_guest(|_| {
                    held_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                })
            })
        };

        held_rx.recv().unwrap();
        assert_eq!(runtime.try_submit("foo").unwrap_err().kind(), ErrorKind::Busy);
        release_tx.send(()).unwrap();
        holder.join().unwrap();

        assert_eq!(runtime.try_submit("foo").unwrap().output, "foo");
        assert_eq!(counter(&runtime, "alloc_calls"), 1);
    }

    #[test]
    fn concurrent_submits_are_serialized() {
        let runtime = Arc::new(TestWasm::Identity.runtime());
        let threads = 4;
        let per_thread = 25;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let runtime = Arc::clone(&runtime);
                thread::spawn(move || {
                    for i in 0..per_thread {
                        let input = format!("thread {t} request {i}");
                        assert_eq!(runtime.submit(&input).unwrap().output, input);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter(&runtime, "solve_calls"), threads * per_thread);
        assert_eq!(counter(&runtime, "free_calls"), 2 * threads * per_thread);
        assert_eq!(counter(&runtime, "live"), 0);
    }

    #[test]
    fn runtime_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TestWasm::Identity.bytes()).unwrap();

        let runtime = GuestRuntime::from_file(file.path(), GuestConfig::default()).unwrap();

        assert_eq!(runtime.submit("from disk").unwrap().output, "from disk");
    }

    #[test]
    fn runtime_from_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();

        let err = GuestRuntime::from_file(dir.path().join("nope.wasm"), GuestConfig::default())
            .err()
            .unwrap();

        assert_eq!(err.kind(), ErrorKind::Setup);
    }

    #[test]
    fn missing_solve_export() {
        let err = GuestRuntime::new(
            TestWasm::Identity.bytes(),
            GuestConfig {
                solve_export: "solve_everything".into(),
                ..Default::default()
            },
        )
        .err()
        .unwrap();

        assert!(matches!(err.error, WasmErrorInner::Export(_)));
    }
}
