use corundum_wasmer_guest::corundum_guest;

/// reverses by char so multibyte input stays valid utf-8
pub fn reverse(input: &str) -> String {
    input.chars().rev().collect()
}

corundum_guest!(reverse);
