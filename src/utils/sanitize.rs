// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;

/// 错误文本截断长度
pub const MAX_ERROR_LEN: usize = 200;

static SECRET_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(api_key|key|token|secret|password|cx)=([^\s&]+)")
        .expect("Failed to compile secret assignment regex")
});

/// 隐去错误文本中的凭据赋值，如 `key=abc` -> `key=***`
pub fn sanitize_error(message: &str) -> String {
    SECRET_ASSIGNMENT
        .replace_all(message, "${1}=***")
        .into_owned()
}

/// 按字符截断，不会切开多字节字符
pub fn truncate(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

/// 先脱敏再截断到 [`MAX_ERROR_LEN`]
pub fn error_excerpt(message: &str) -> String {
    truncate(&sanitize_error(message), MAX_ERROR_LEN)
}
