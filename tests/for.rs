#[macro_use]
mod common;

#[cfg(test)]
mod _for {
    tests! {
        sum in for is OK
        "6"
    }

    tests! {
        no_clauses in for is OK
        "done"
    }

    tests! {
        existing_variable in for is OK
        "0"
        "1"
        "2"
    }

    tests! {
        closure_captures_loop_variable in for is OK
        "1"
    }
}
