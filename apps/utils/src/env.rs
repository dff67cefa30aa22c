//! 从环境变量解析运行参数.

use ct_lung::config::PipelineConfig;
use ct_lung::error::ConfigError;
use log::LevelFilter;
use std::env;
use std::path::{Path, PathBuf};

/// 配置文件路径的环境变量.
pub const CONFIG_VAR: &str = "CT_LUNG_CONFIG";

/// 预览图输出目录的环境变量.
pub const OUT_DIR_VAR: &str = "CT_LUNG_OUT_DIR";

/// 日志级别的环境变量.
pub const LOG_VAR: &str = "CT_LUNG_LOG";

/// 输入目录下的默认配置文件名.
pub const CONFIG_FILE_NAME: &str = "segment.json";

/// 非空的环境变量值.
fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// 获取配置文件路径.
///
/// 1. 若环境变量 `$CT_LUNG_CONFIG` 非空, 则返回其值;
/// 2. 否则, 若 `input` 是目录且其中存在 `segment.json`, 则返回该文件;
/// 3. 否则返回 `None`, 即使用内置默认配置.
pub fn config_path(input: &Path) -> Option<PathBuf> {
    if let Some(p) = non_empty(CONFIG_VAR) {
        return Some(PathBuf::from(p));
    }
    let local = input.join(CONFIG_FILE_NAME);
    local.is_file().then_some(local)
}

/// 按 [`config_path`] 的规则加载配置.
pub fn load_config(input: &Path) -> Result<PipelineConfig, ConfigError> {
    match config_path(input) {
        Some(path) => {
            log::info!("using configuration `{}`", path.display());
            PipelineConfig::open(path)
        }
        None => {
            log::info!("no configuration file, using built-in defaults");
            Ok(PipelineConfig::default())
        }
    }
}

/// 获取预览图输出目录. `$CT_LUNG_OUT_DIR` 为空时返回当前目录.
pub fn out_dir() -> PathBuf {
    non_empty(OUT_DIR_VAR).map_or_else(|| PathBuf::from("."), PathBuf::from)
}

/// 解析日志级别, 不区分大小写. 无法识别时返回 `None`.
pub fn parse_level(s: &str) -> Option<LevelFilter> {
    s.trim().parse().ok()
}

/// 获取日志级别. `$CT_LUNG_LOG` 为空或无法识别时为 `info`.
pub fn log_level() -> LevelFilter {
    non_empty(LOG_VAR)
        .and_then(|s| parse_level(&s))
        .unwrap_or(LevelFilter::Info)
}
