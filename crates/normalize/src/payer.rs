use regex::Regex;

use crate::only_digits;

/// Identifier and display name split out of a combined payer field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayerIdentity {
    /// CPF/CNPJ digits only, possibly empty.
    pub cpfcnpj: String,
    pub nome: String,
}

/// Splits fields like `"12.345.678/0001-90 EMPRESA LTDA"` into identifier
/// and name using an ordered rule cascade. Only the first matching rule
/// applies; the rules are mutually exclusive.
pub struct PayerExtractor {
    cnpj_completo: Regex,
    cnpj_parcial: Regex,
    cpf_completo: Regex,
    prefixo_numerico: Regex,
}

impl PayerExtractor {
    pub fn new() -> Self {
        Self {
            // 12.345.678/0001-90 NOME
            cnpj_completo: Regex::new(r"^(\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2})\s+(.+)$").unwrap(),
            // 12.345.678 NOME (truncated CNPJ, common on report layouts)
            cnpj_parcial: Regex::new(r"^(\d{2}\.\d{3}\.\d{3})\s+(.+)$").unwrap(),
            // 123.456.789-09 NOME
            cpf_completo: Regex::new(r"^(\d{3}\.\d{3}\.\d{3}-\d{2})\s+(.+)$").unwrap(),
            // Generic leading run of digits and separators, then a name.
            prefixo_numerico: Regex::new(r"^([\d./-]+)\s+(.+)$").unwrap(),
        }
    }

    pub fn extract(&self, campo: &str) -> PayerIdentity {
        let campo = campo.trim();

        for re in [&self.cnpj_completo, &self.cnpj_parcial, &self.cpf_completo] {
            if let Some(caps) = re.captures(campo) {
                return PayerIdentity {
                    cpfcnpj: only_digits(&caps[1]),
                    nome: caps[2].trim().to_string(),
                };
            }
        }

        if let Some(caps) = self.prefixo_numerico.captures(campo) {
            let digits = only_digits(&caps[1]);
            // Shorter runs are more likely part of the name than an identifier.
            if digits.len() >= 8 {
                return PayerIdentity {
                    cpfcnpj: digits,
                    nome: caps[2].trim().to_string(),
                };
            }
        }

        PayerIdentity {
            cpfcnpj: String::new(),
            nome: campo.to_string(),
        }
    }
}

impl Default for PayerExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cnpj_then_name() {
        let ex = PayerExtractor::new();
        let id = ex.extract("12.345.678/0001-90 EMPRESA EXEMPLO LTDA");
        assert_eq!(id.cpfcnpj, "12345678000190");
        assert_eq!(id.nome, "EMPRESA EXEMPLO LTDA");
    }

    #[test]
    fn test_partial_cnpj_then_name() {
        let ex = PayerExtractor::new();
        let id = ex.extract("43.199.386 KATIA GEANNE DE LIMA");
        assert_eq!(id.cpfcnpj, "43199386");
        assert_eq!(id.nome, "KATIA GEANNE DE LIMA");
    }

    #[test]
    fn test_full_cpf_then_name() {
        let ex = PayerExtractor::new();
        let id = ex.extract("123.456.789-09 JOAO DA SILVA");
        assert_eq!(id.cpfcnpj, "12345678909");
        assert_eq!(id.nome, "JOAO DA SILVA");
    }

    #[test]
    fn test_generic_digit_run() {
        let ex = PayerExtractor::new();
        let id = ex.extract("12345678901 MARIA DE SOUZA");
        assert_eq!(id.cpfcnpj, "12345678901");
        assert_eq!(id.nome, "MARIA DE SOUZA");
    }

    #[test]
    fn test_short_digit_run_is_part_of_the_name() {
        let ex = PayerExtractor::new();
        let id = ex.extract("123 TRANSPORTES LTDA");
        assert_eq!(id.cpfcnpj, "");
        assert_eq!(id.nome, "123 TRANSPORTES LTDA");
    }

    #[test]
    fn test_no_identifier_at_all() {
        let ex = PayerExtractor::new();
        let id = ex.extract("CONDOMINIO EDIFICIO CENTRAL");
        assert_eq!(id.cpfcnpj, "");
        assert_eq!(id.nome, "CONDOMINIO EDIFICIO CENTRAL");
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // Full CNPJ must not be consumed by the partial rule.
        let ex = PayerExtractor::new();
        let id = ex.extract("12.345.678/0001-90 X");
        assert_eq!(id.cpfcnpj, "12345678000190");
    }
}
