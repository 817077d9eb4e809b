use rand::Rng;
use rand::distributions::Alphanumeric;

/// 生成随机初始密码（保证同时含字母和数字，满足密码策略）
pub fn generate_password(len: usize) -> String {
    let len = len.max(8);
    let mut rng = rand::thread_rng();
    loop {
        let candidate: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect();
        let has_letter = candidate.chars().any(|c| c.is_ascii_alphabetic());
        let has_digit = candidate.chars().any(|c| c.is_ascii_digit());
        if has_letter && has_digit {
            return candidate;
        }
    }
}
