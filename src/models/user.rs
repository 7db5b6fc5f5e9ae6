//! Birthday user profile and roles.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application role stored in `user_roles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Aniversariante,
    Estabelecimento,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Aniversariante => "aniversariante",
            Role::Estabelecimento => "estabelecimento",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aniversariante" => Ok(Role::Aniversariante),
            "estabelecimento" => Ok(Role::Estabelecimento),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Row of the `user_roles` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role: Role,
}

/// Birthday user profile stored in the `aniversariantes` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BirthdayUser {
    /// Auth user ID (also the primary key)
    pub id: Uuid,
    #[serde(rename = "nome", default)]
    pub name: Option<String>,
    /// CPF, digits only
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(rename = "data_nascimento", default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub cep: Option<String>,
    #[serde(rename = "estado", default)]
    pub state: Option<String>,
    #[serde(rename = "cidade", default)]
    pub city: Option<String>,
    #[serde(rename = "bairro", default)]
    pub neighborhood: Option<String>,
    #[serde(rename = "logradouro", default)]
    pub street: Option<String>,
    #[serde(rename = "numero", default)]
    pub number: Option<String>,
    /// Registration complete flag gating protected areas
    #[serde(default)]
    pub cadastro_completo: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BirthdayUser {
    /// An empty profile as created at signup (wizard step 1).
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            name: None,
            cpf: None,
            birth_date: None,
            phone: None,
            cep: None,
            state: None,
            city: None,
            neighborhood: None,
            street: None,
            number: None,
            cadastro_completo: false,
            updated_at: None,
        }
    }

    /// Names of required fields that are missing or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());

        let mut missing = Vec::new();
        if blank(&self.cpf) {
            missing.push("cpf");
        }
        if self.birth_date.is_none() {
            missing.push("data_nascimento");
        }
        if blank(&self.phone) {
            missing.push("telefone");
        }
        if blank(&self.city) {
            missing.push("cidade");
        }
        if blank(&self.state) {
            missing.push("estado");
        }
        missing
    }

    /// Completion flag set and every required field present.
    pub fn is_complete(&self) -> bool {
        self.cadastro_completo && self.missing_fields().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_user() -> BirthdayUser {
        BirthdayUser {
            cpf: Some("52998224725".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 17),
            phone: Some("48999998888".to_string()),
            city: Some("Florianópolis".to_string()),
            state: Some("SC".to_string()),
            cadastro_completo: true,
            ..BirthdayUser::new(Uuid::new_v4())
        }
    }

    #[test]
    fn test_complete_profile() {
        let user = complete_user();
        assert!(user.missing_fields().is_empty());
        assert!(user.is_complete());
    }

    #[test]
    fn test_flag_alone_is_not_enough() {
        let mut user = complete_user();
        user.phone = Some("   ".to_string());
        assert_eq!(user.missing_fields(), vec!["telefone"]);
        assert!(!user.is_complete());
    }

    #[test]
    fn test_fields_without_flag() {
        let mut user = complete_user();
        user.cadastro_completo = false;
        assert!(!user.is_complete());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Aniversariante".parse::<Role>(), Ok(Role::Aniversariante));
        assert_eq!(" admin ".parse::<Role>(), Ok(Role::Admin));
        assert!("cliente".parse::<Role>().is_err());
    }
}
