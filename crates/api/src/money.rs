/// Deal and listing values are stored as integer cents and rendered in a
/// single fixed locale (pt-BR): "R$ 1.234,56".
pub fn format_brl(cents: i64) -> String {
    let negative = cents < 0;
    let abs = cents.unsigned_abs();
    let reais = abs / 100;
    let centavos = abs % 100;

    let digits = reais.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}R$ {},{:02}", sign, grouped, centavos)
}

#[cfg(test)]
mod tests {
    use super::format_brl;

    #[test]
    fn formats_plain_values() {
        assert_eq!(format_brl(0), "R$ 0,00");
        assert_eq!(format_brl(100), "R$ 1,00");
        assert_eq!(format_brl(123_456), "R$ 1.234,56");
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(format_brl(36_000_000_00), "R$ 36.000.000,00");
        assert_eq!(format_brl(120_000_000), "R$ 1.200.000,00");
    }

    #[test]
    fn keeps_sign() {
        assert_eq!(format_brl(-9_950), "-R$ 99,50");
    }
}
