// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::utils::errors::ArtifactError;
use crate::utils::url_utils::ensure_scheme;

/// 预检输出路径可写
///
/// 目录不存在时创建，随后在目标旁写入并删除一个探测文件
pub fn ensure_writable(path: &Path) -> Result<(), ArtifactError> {
    let not_writable = |source| ArtifactError::NotWritable {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&parent).map_err(not_writable)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let probe = parent.join(format!(".{}.write-probe", file_name));
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&probe)
        .map_err(not_writable)?;
    fs::remove_file(&probe).map_err(not_writable)?;

    Ok(())
}

/// 写出发现结果：每行一个域名，无表头，无空行
pub fn write_domains(path: &Path, domains: &[String]) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    for domain in domains.iter().filter(|d| !d.is_empty()) {
        writeln!(file, "{}", domain)?;
    }
    file.flush()?;
    Ok(())
}

/// 读取审计目标
///
/// 忽略空行和 `#` 注释，缺少协议时补 https://
pub fn read_targets(path: &Path) -> Result<Vec<String>, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::MissingInput(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    let targets: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ensure_scheme)
        .collect();

    if targets.is_empty() {
        return Err(ArtifactError::EmptyInput(path.to_path_buf()));
    }
    Ok(targets)
}
