#[macro_use]
mod common;

#[cfg(test)]
mod _while {
    tests! {
        count in while is OK
        "0"
        "1"
        "2"
    }

    tests! {
        condition_initially_false in while is OK
        "done"
    }

    tests! {
        return_from_loop in while is OK
        "2"
    }
}
