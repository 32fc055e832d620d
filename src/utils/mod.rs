use uuid::Uuid;

// 加入码字母表，去掉了容易混淆的 0/O、1/I/L
const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const JOIN_CODE_LEN: usize = 8;

// v4 UUID 中第 6、8 字节的高位是固定的版本号和变体位
const UUID_FIXED_BYTES: [usize; 2] = [6, 8];

/// 由 v4 UUID 的随机字节生成加入码，唯一性由存储层保证。
///
/// 超出字母表整数倍的字节直接丢弃，每个字符在字母表上均匀分布。
pub fn generate_join_code() -> String {
    let alphabet_len = JOIN_CODE_ALPHABET.len();
    let limit = 256 - 256 % alphabet_len;
    let mut code = String::with_capacity(JOIN_CODE_LEN);

    while code.len() < JOIN_CODE_LEN {
        let bytes = Uuid::new_v4().into_bytes();
        for (i, b) in bytes.iter().enumerate() {
            if UUID_FIXED_BYTES.contains(&i) || *b as usize >= limit {
                continue;
            }
            code.push(JOIN_CODE_ALPHABET[*b as usize % alphabet_len] as char);
            if code.len() == JOIN_CODE_LEN {
                break;
            }
        }
    }
    code
}

/// 规范化用户输入的加入码：去空白并转大写
pub fn normalize_join_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

pub mod error_codes {
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const DUPLICATE_POINT: i32 = 1001;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const TIMEOUT: i32 = 1006;
    pub const INTERNAL_ERROR: i32 = 5000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_code_uses_alphabet() {
        for _ in 0..100 {
            let code = generate_join_code();
            assert_eq!(code.len(), JOIN_CODE_LEN);
            assert!(code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn every_position_spreads_over_the_alphabet() {
        let codes: Vec<String> = (0..2000).map(|_| generate_join_code()).collect();
        for pos in 0..JOIN_CODE_LEN {
            let mut seen = [false; 256];
            for code in &codes {
                seen[code.as_bytes()[pos] as usize] = true;
            }
            let distinct = seen.iter().filter(|s| **s).count();
            assert!(
                distinct > JOIN_CODE_ALPHABET.len() / 2,
                "position {} only produced {} symbols",
                pos,
                distinct
            );
        }
    }

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize_join_code("  ab3k9xyz \n"), "AB3K9XYZ");
    }
}
