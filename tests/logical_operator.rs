#[macro_use]
mod common;

#[cfg(test)]
mod logical_operator {
    tests! {
        or_returns_operand in logical_operator is OK
        "hi"
        "yes"
        "nil"
    }

    tests! {
        and_returns_operand in logical_operator is OK
        "2"
        "nil"
        "false"
    }

    tests! {
        short_circuit in logical_operator is OK
        "false"
        "false"
        "true"
    }
}
