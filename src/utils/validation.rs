//! 输入验证工具函数

/// 规范化并验证一次性验证码
///
/// 只去掉首尾空白并拒绝空串；格式和长度由服务端判定
///
/// # 返回
/// - `Ok(&str)`: 去掉空白后的验证码
/// - `Err(String)`: 错误信息
pub fn validate_one_time_code(code: &str) -> Result<&str, String> {
    let code = code.trim();
    if code.is_empty() {
        return Err("一次性验证码为空".to_string());
    }
    Ok(code)
}
