//! `segment <input_dir>`: 对切片目录 (或 nifti 文件) 做肺部分割, 输出预览图.
//!
//! 环境变量见 [`utils::env`].

mod runner;
mod summary;

use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let level = utils::env::log_level();
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("cannot install logger: {e}");
    }

    let mut args = std::env::args_os().skip(1);
    let (Some(input), None) = (args.next(), args.next()) else {
        eprintln!("usage: segment <input_dir>");
        return ExitCode::from(2);
    };
    let input = PathBuf::from(input);

    match runner::run(&input) {
        Ok(summary) => {
            summary.print();
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("segment: {e}");
            ExitCode::FAILURE
        }
    }
}
