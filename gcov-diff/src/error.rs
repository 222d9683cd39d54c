error_chain! {
    links {
        Covdiff(::covdiff::Error, ::covdiff::ErrorKind);
    }

    foreign_links {
        Io(::std::io::Error);
    }

    errors {
        ObjectPathWithoutSourceFile {
            description("--object-path requires --source-file")
        }

        InvalidJobs(value: String) {
            description("invalid number of jobs")
            display("invalid number of jobs `{}`, expected a positive integer", value)
        }

        UnsupportedName(option: &'static str, value: String) {
            description("unsupported option value")
            display("unsupported value `{}` for {}", value, option)
        }
    }
}
