#[macro_use]
mod common;

#[cfg(test)]
mod _if {
    tests! {
        then_and_else in if is OK
        "then"
        "else"
    }

    tests! {
        truthiness in if is OK
        "zero"
        "empty"
        "nil is false"
    }

    tests! {
        dangling_else in if is OK
        "dangling"
    }
}
