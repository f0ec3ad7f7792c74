#[macro_use]
mod common;

#[cfg(test)]
mod function {
    tests! {
        declaration_and_call in function is OK
        "Hello, Shale"
        "<fn greet>"
    }

    tests! {
        implicit_nil_return in function is OK
        "nil"
        "nil"
    }

    tests! {
        recursion in function is OK
        "55"
    }

    tests! {
        parameters_are_local in function is OK
        "param"
        "global"
    }

    tests! {
        arity_mismatch in function is ERR
        "[line 2:4] Error at ')': Expected 2 arguments but got 1"
    }

    tests! {
        call_non_callable in function is ERR
        "[line 1:26] Error at ')': Can only call functions and classes"
    }

    tests! {
        native_arity in function is ERR
        "[line 1:8] Error at ')': Expected 0 arguments but got 1"
    }
}
