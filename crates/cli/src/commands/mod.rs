// CLI subcommands

pub mod batch;
pub mod execute;
pub mod query;

use slim_db::DbValue;

/// Turn `--param` literals into bound values
pub fn parse_params(raw: &[String]) -> Vec<DbValue> {
    raw.iter().map(|p| DbValue::parse_literal(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params() {
        let raw: Vec<String> = ["2", "b", "null", "1.5", "'42'"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(
            parse_params(&raw),
            vec![
                DbValue::Integer(2),
                DbValue::Text("b".to_string()),
                DbValue::Null,
                DbValue::Real(1.5),
                DbValue::Text("42".to_string()),
            ]
        );
    }
}
