#[macro_use]
mod common;

#[cfg(test)]
mod this {
    tests! {
        bound_to_instance in this is OK
        "lime stone"
    }

    tests! {
        callback_keeps_this in this is OK
        "ok"
    }

    tests! {
        this_in_function in this is ERR
        "[line 2:9] Error at 'this': Cannot use 'this' outside of a class"
    }

    tests! {
        this_at_top_level in this is ERR
        "[line 1:7] Error at 'this': Cannot use 'this' outside of a class"
    }
}
