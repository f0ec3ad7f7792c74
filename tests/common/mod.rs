#[macro_export]
macro_rules! tests {
    ($file:ident in $scope:ident is OK $($expected:expr)*) => {
        #[test]
        fn $file() {
            use shale_lang::shale;

            let mut expected: Vec<&str> = vec![$($expected),*];

            // if exists, concat expected lines with new lines
            let expected = match expected.len() {
                0 => "".to_string(),
                _ => {
                    // add empty string to end to add new line to end of output
                    expected.push("");
                    expected.join("\n")
                }
            };

            let mut output: Vec<u8> = Vec::new();
            let mut shale = shale::new(&mut output);

            shale.run_file(&format!("tests/target/{}/{}.shale", stringify!($scope), stringify!($file)));

            // drop shale here to release the borrow on output
            drop(shale);
            assert_eq!(expected, std::str::from_utf8(&output).unwrap());
        }
    };

    ($file:ident in $scope:ident is ERR $($expected:expr)+) => {
        #[test]
        fn $file() {
            use assert_cmd::Command;

            // stderr concats expected with new lines
            let output = vec![$($expected),+].join("\n");
            let file = format!("tests/target/{}/{}.shale", stringify!($scope), stringify!($file));

            Command::cargo_bin("shale").unwrap()
                .arg(file)
                .assert()
                .stderr(format!("{output}\n"))
                .failure();
        }
    };
}
