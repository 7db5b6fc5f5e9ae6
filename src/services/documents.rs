// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Brazilian document and contact validation (CPF, CNPJ, phone, CEP, UF).
//!
//! The `validate_*` functions adapt the checks for `#[validate(custom)]`.

use std::borrow::Cow;
use validator::ValidationError;

/// The 27 federative unit codes.
pub const UFS: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB", "PR",
    "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

/// Keep only ASCII digits.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn to_digits(s: &str) -> Vec<u32> {
    s.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

/// Mod-11 check digit over `digits` with the given weights.
fn check_digit(digits: &[u32], weights: impl Iterator<Item = u32>) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        0 | 1 => 0,
        r => 11 - r,
    }
}

/// Validate a CPF, formatted (`529.982.247-25`) or bare.
///
/// The ten repeated-digit sequences are rejected regardless of checksum.
pub fn is_valid_cpf(raw: &str) -> bool {
    let digits = to_digits(&digits_only(raw));
    if digits.len() != 11 || all_same(&digits) {
        return false;
    }

    let first = check_digit(&digits[..9], (2..=10).rev());
    let second = check_digit(&digits[..10], (2..=11).rev());
    digits[9] == first && digits[10] == second
}

/// Validate a CNPJ, formatted (`11.222.333/0001-81`) or bare.
pub fn is_valid_cnpj(raw: &str) -> bool {
    const FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    let digits = to_digits(&digits_only(raw));
    if digits.len() != 14 || all_same(&digits) {
        return false;
    }

    let first = check_digit(&digits[..12], FIRST_WEIGHTS.into_iter());
    let second = check_digit(&digits[..13], SECOND_WEIGHTS.into_iter());
    digits[12] == first && digits[13] == second
}

/// Validate a Brazilian phone number: DDD (11–99, no zero digit) followed by
/// an 8-digit landline or a 9-digit mobile starting with 9.
pub fn is_valid_phone(raw: &str) -> bool {
    let digits = digits_only(raw);
    let digits = digits.strip_prefix("55").filter(|_| digits.len() > 11).unwrap_or(&digits);

    let bytes = digits.as_bytes();
    match bytes.len() {
        10 | 11 => {}
        _ => return false,
    }
    if bytes[0] == b'0' || bytes[1] == b'0' {
        return false;
    }
    match bytes.len() {
        11 => bytes[2] == b'9',
        _ => (b'2'..=b'5').contains(&bytes[2]),
    }
}

/// CEP: exactly eight digits, formatted (`88015-100`) or bare.
pub fn is_valid_cep(raw: &str) -> bool {
    let digits = digits_only(raw);
    digits.len() == 8 && raw.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '.')
}

/// Two-letter federative unit code, any casing.
pub fn is_valid_uf(raw: &str) -> bool {
    let upper = raw.trim().to_ascii_uppercase();
    UFS.contains(&upper.as_str())
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn validate_cpf(value: &str) -> Result<(), ValidationError> {
    if is_valid_cpf(value) {
        Ok(())
    } else {
        Err(invalid("cpf", "CPF inválido"))
    }
}

pub fn validate_cnpj(value: &str) -> Result<(), ValidationError> {
    if is_valid_cnpj(value) {
        Ok(())
    } else {
        Err(invalid("cnpj", "CNPJ inválido"))
    }
}

pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if is_valid_phone(value) {
        Ok(())
    } else {
        Err(invalid("phone", "Telefone inválido"))
    }
}

pub fn validate_cep(value: &str) -> Result<(), ValidationError> {
    if is_valid_cep(value) {
        Ok(())
    } else {
        Err(invalid("cep", "CEP inválido"))
    }
}

pub fn validate_uf(value: &str) -> Result<(), ValidationError> {
    if is_valid_uf(value) {
        Ok(())
    } else {
        Err(invalid("uf", "Estado inválido"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_cpf() {
        assert!(is_valid_cpf("529.982.247-25"));
        assert!(is_valid_cpf("52998224725"));
        assert!(is_valid_cpf(" 529 982 247 25 "));
    }

    #[test]
    fn test_cpf_checksum_failures() {
        assert!(!is_valid_cpf("529.982.247-24"));
        assert!(!is_valid_cpf("529.982.247-15"));
        assert!(!is_valid_cpf("12345678900"));
    }

    #[test]
    fn test_cpf_repeated_digits_rejected() {
        for d in 0..=9 {
            let cpf = d.to_string().repeat(11);
            assert!(!is_valid_cpf(&cpf), "{} should be rejected", cpf);
        }
        assert!(!is_valid_cpf("111.111.111-11"));
    }

    #[test]
    fn test_cpf_wrong_length() {
        assert!(!is_valid_cpf(""));
        assert!(!is_valid_cpf("5299822472"));
        assert!(!is_valid_cpf("529982247250"));
    }

    #[test]
    fn test_cnpj() {
        assert!(is_valid_cnpj("11.222.333/0001-81"));
        assert!(is_valid_cnpj("11222333000181"));
        assert!(!is_valid_cnpj("11.222.333/0001-82"));
        assert!(!is_valid_cnpj("00000000000000"));
        assert!(!is_valid_cnpj("1122233300018"));
    }

    #[test]
    fn test_phone() {
        assert!(is_valid_phone("(48) 99999-8888"));
        assert!(is_valid_phone("4833334444"));
        assert!(is_valid_phone("+55 48 99999-8888"));
        assert!(!is_valid_phone("(48) 89999-8888"));
        assert!(!is_valid_phone("(08) 99999-8888"));
        assert!(!is_valid_phone("4899998"));
    }

    #[test]
    fn test_cep_and_uf() {
        assert!(is_valid_cep("88015-100"));
        assert!(is_valid_cep("88015100"));
        assert!(!is_valid_cep("8801510"));
        assert!(!is_valid_cep("88015-10a"));

        assert!(is_valid_uf("sc"));
        assert!(is_valid_uf("SP"));
        assert!(!is_valid_uf("XX"));
        assert!(!is_valid_uf("Santa Catarina"));
    }

    #[test]
    fn test_validator_adapters() {
        assert!(validate_cpf("529.982.247-25").is_ok());
        let err = validate_cpf("111.111.111-11").unwrap_err();
        assert_eq!(err.code, "cpf");
    }
}
