/// 密码加密和验证
///
/// 对上层来说这是一个不透明的单向哈希/校验能力，内部使用 bcrypt。

use bcrypt::{hash, verify, DEFAULT_COST};
use crate::error::ServerError;

/// 密码加密成本
///
/// 成本值越高越安全，但也越慢。默认值 12 在安全和登录延迟之间取平衡。
pub const PASSWORD_COST: u32 = DEFAULT_COST;

/// 加密密码
///
/// 返回 60 字符的 bcrypt 哈希，每次调用 salt 不同
pub fn hash_password(password: &str) -> Result<String, ServerError> {
    hash(password, PASSWORD_COST)
        .map_err(|e| ServerError::Internal(format!("密码加密失败: {}", e)))
}

/// 验证密码
///
/// 比较明文密码和存储的哈希值是否匹配；Err 只表示校验过程本身出错
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ServerError> {
    verify(password, hash)
        .map_err(|e| ServerError::Internal(format!("密码验证失败: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "secret123";
        let hash = hash_password(password).unwrap();

        // bcrypt 哈希总是 60 字符
        assert_eq!(hash.len(), 60);
        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_same_password_different_hash() {
        let password = "secret123";
        let hash1 = hash_password(password).unwrap();
        let hash2 = hash_password(password).unwrap();

        // salt 不同，哈希值应该不同
        assert_ne!(hash1, hash2);
        assert!(verify_password(password, &hash1).unwrap());
        assert!(verify_password(password, &hash2).unwrap());
    }
}
