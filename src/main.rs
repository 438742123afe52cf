use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use ext_word_sort::{WordSorter, WordSorterBuilder};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let word_length: usize = arg_parser.value_of_t_or_exit("word_length");
    let batch_size: usize = arg_parser.value_of_t_or_exit("batch_size");
    let tmp_dir: Option<&str> = arg_parser.value_of("tmp_dir");
    let rw_buf_size: Option<&str> = arg_parser.value_of("rw_buf_size");

    let input = arg_parser.value_of("input").expect("value is required");
    let output = arg_parser.value_of("output").expect("value is required");

    let mut sorter_builder = WordSorterBuilder::new()
        .with_word_length(word_length)
        .with_batch_size(batch_size);

    if let Some(tmp_dir) = tmp_dir {
        sorter_builder = sorter_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    if let Some(rw_buf_size) = rw_buf_size {
        sorter_builder = sorter_builder.with_rw_buf_size(
            parse_buf_size(rw_buf_size).expect("value is pre-validated"),
        );
    }

    let sorter: WordSorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    if let Err(err) = sorter.sort_file(path::Path::new(input), path::Path::new(output)) {
        log::error!("word sorting error: {}", err);
        process::exit(1);
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("word-sort")
        .about("sorts and deduplicates the words of a text file using bounded memory")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("file to be sorted")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("result file")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("word_length")
                .short('w')
                .long("word-length")
                .help("maximum number of characters of a word sorted in memory")
                .takes_value(true)
                .default_value("50")
                .validator(positive_number),
        )
        .arg(
            clap::Arg::new("batch_size")
                .short('b')
                .long("batch-size")
                .help("maximum number of words sorted in memory at once")
                .takes_value(true)
                .default_value("2000")
                .validator(positive_number),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary data")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("rw_buf_size")
                .long("rw-buf-size")
                .help("file read/write buffer size")
                .takes_value(true)
                .validator(|v| parse_buf_size(v).map(|_| ())),
        )
        .get_matches()
}

fn positive_number(v: &str) -> Result<(), String> {
    match v.parse::<usize>() {
        Ok(0) => Err("Value must be positive".to_string()),
        Ok(_) => Ok(()),
        Err(err) => Err(format!("Number format incorrect: {}", err)),
    }
}

fn parse_buf_size(v: &str) -> Result<usize, String> {
    let size = v
        .parse::<ByteSize>()
        .map_err(|err| format!("Buffer size format incorrect: {}", err))?;

    match usize::try_from(size.as_u64()) {
        Ok(0) => Err("Buffer size must be positive".to_string()),
        Ok(size) => Ok(size),
        Err(_) => Err(format!("Buffer size exceeds the platform limit of {} bytes", usize::MAX)),
    }
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::parse_buf_size;

    #[rstest]
    #[case("64", Ok(64))]
    #[case("1 KiB", Ok(1024))]
    #[case("0", Err(()))]
    #[case("lots", Err(()))]
    fn test_parse_buf_size(#[case] value: &str, #[case] expected: Result<usize, ()>) {
        assert_eq!(parse_buf_size(value).map_err(|_| ()), expected);
    }

    #[test]
    #[cfg(target_pointer_width = "32")]
    fn test_parse_buf_size_overflow() {
        let err = parse_buf_size("8 GiB").unwrap_err();
        assert!(err.contains("platform limit"), "{}", err);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_parse_buf_size_large() {
        assert_eq!(parse_buf_size("8 GiB"), Ok(8 * 1024 * 1024 * 1024));
    }
}
