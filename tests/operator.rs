#[macro_use]
mod common;

#[cfg(test)]
mod operator {
    tests! {
        arithmetic in operator is OK
        "3"
        "4"
        "12"
        "2.5"
        "7"
        "9"
    }

    tests! {
        unary in operator is OK
        "-3"
        "3"
        "false"
        "true"
        "false"
    }

    tests! {
        comparison in operator is OK
        "true"
        "true"
        "false"
        "true"
    }

    tests! {
        equality in operator is OK
        "true"
        "false"
        "true"
        "false"
        "true"
        "false"
        "false"
        "true"
    }

    tests! {
        string_concat in operator is OK
        "foobar"
        "x"
    }

    tests! {
        add_mixed_types in operator is ERR
        "[line 1:11] Error at '+': Operands must be two numbers or two strings"
    }

    tests! {
        negate_string in operator is ERR
        "[line 1:7] Error at '-': Operand must be a number"
    }

    tests! {
        compare_strings in operator is ERR
        "[line 1:11] Error at '<': Operands must be numbers"
    }

    tests! {
        subtract_strings in operator is ERR
        "[line 1:11] Error at '-': Operands must be numbers"
    }
}
