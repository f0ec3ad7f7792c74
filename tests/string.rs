#[macro_use]
mod common;

#[cfg(test)]
mod string {
    tests! {
        multiline in string is OK
        "one"
        "two"
    }

    tests! {
        unicode in string is OK
        "héllo wörld"
    }

    tests! {
        unterminated in string is ERR
        "[line 1:7] Error: Unterminated string"
    }
}
