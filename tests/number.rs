#[macro_use]
mod common;

#[cfg(test)]
mod number {
    tests! {
        display in number is OK
        "1"
        "1.5"
        "-0.5"
        "2.5"
        "0.6666666666666666"
        "1000000"
        "123.456"
    }

    tests! {
        precision in number is OK
        "0.30000000000000004"
    }
}
