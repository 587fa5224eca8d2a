use serde::{Deserialize, Serialize};

const ANONYMOUS_LOGIN: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
    pub name: String,
}

impl User {
    pub fn new(id: u64, login: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
            name: name.into(),
        }
    }

    /// インポートした添付ファイルの作成者として使うシステムユーザー
    pub fn anonymous() -> Self {
        Self::new(0, ANONYMOUS_LOGIN, "Anonymous")
    }

    pub fn is_anonymous(&self) -> bool {
        self.login == ANONYMOUS_LOGIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_user() {
        let user = User::anonymous();

        assert!(user.is_anonymous());
        assert_eq!(user.name, "Anonymous");
        assert!(!User::new(5, "alice", "Alice").is_anonymous());
    }
}
