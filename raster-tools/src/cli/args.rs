pub use clap::{App, Arg, ArgMatches};
pub use inflector::Inflector;

use std::fmt::Display;
use std::str::FromStr;

#[macro_export]
macro_rules! args_parser {
    ($name:expr) => {{
        $crate::cli::args::App::new($name)
            .version(clap::crate_version!())
            .author(clap::crate_authors!())
    }};
}

/// Positional argument named `$name`.
#[macro_export]
macro_rules! arg {
    ($name:expr) => {{
        use inflector::Inflector;
        $crate::cli::args::Arg::with_name($name).value_name(&$name.to_screaming_snake_case())
    }};
}

/// Option `--kebab-case-name VALUE`.
#[macro_export]
macro_rules! opt {
    ($name:expr) => {{
        use inflector::Inflector;
        $crate::cli::args::Arg::with_name($name)
            .long(&$name.to_kebab_case())
            .takes_value(true)
            .value_name(&$name.to_screaming_snake_case())
    }};
}

/// Parse the value of `name` with `FromStr`. Exits with a
/// usage error if the value is present but invalid.
pub fn parse_opt<T>(matches: &ArgMatches, name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = matches.value_of(name)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(e) => invalid_value(&format!("invalid value {:?} for --{}: {:#}", raw, name.to_kebab_case(), e)),
    }
}

/// Exit with a usage error.
pub fn invalid_value(msg: &str) -> ! {
    clap::Error::with_description(msg, clap::ErrorKind::InvalidValue).exit()
}
