#[macro_use]
mod common;

#[cfg(test)]
mod constructor {
    tests! {
        init_runs_on_call in constructor is OK
        "1"
        "2"
    }

    tests! {
        early_return_yields_instance in constructor is OK
        "Foo instance"
    }

    tests! {
        direct_init_call_returns_this in constructor is OK
        "Foo instance"
    }

    tests! {
        inherited_init in constructor is OK
        "7"
    }

    tests! {
        default_arity_is_zero in constructor is ERR
        "[line 2:6] Error at ')': Expected 0 arguments but got 1"
    }

    tests! {
        init_arity_enforced in constructor is ERR
        "[line 4:8] Error at ')': Expected 2 arguments but got 1"
    }

    tests! {
        return_value_from_init in constructor is ERR
        "[line 3:5] Error at 'return': Cannot return a value from an initializer"
    }
}
