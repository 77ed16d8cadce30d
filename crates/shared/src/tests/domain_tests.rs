use super::*;

const SAMPLE_ACCOUNT: &str = "0f2a4bd0e1c3b5a7968778695a4b3c2d1e0f1a2b3c4d5e6f708192a3b4c5d6e7";

#[test]
fn account_round_trips_through_hex() {
    let account = AccountId::from_hex(SAMPLE_ACCOUNT).expect("valid account");
    assert_eq!(account.hash[0], 0x0f);
    assert_eq!(account.hash[31], 0xe7);
    assert_eq!(account.to_string(), SAMPLE_ACCOUNT);
}

#[test]
fn account_accepts_uppercase_hex() {
    let account: AccountId = SAMPLE_ACCOUNT
        .to_ascii_uppercase()
        .parse()
        .expect("uppercase hex");
    assert_eq!(account.to_string(), SAMPLE_ACCOUNT);
}

#[test]
fn account_rejects_wrong_length_and_non_hex() {
    assert_eq!(
        AccountId::from_hex("abcd"),
        Err(AccountParseError::InvalidLength {
            expected: 64,
            actual: 4
        })
    );

    let not_hex = format!("zz{}", &SAMPLE_ACCOUNT[2..]);
    assert_eq!(
        AccountId::from_hex(&not_hex),
        Err(AccountParseError::InvalidHex)
    );
}

#[test]
fn account_serializes_as_hash_bytes() {
    let account = AccountId { hash: [7u8; 32] };
    let json = serde_json::to_value(account).expect("serialize");
    assert_eq!(json["hash"].as_array().map(Vec::len), Some(32));
    assert_eq!(json["hash"][0], 7);
}

#[test]
fn parses_whole_and_fractional_tokens() {
    assert_eq!(
        TokenAmount::parse_tokens("5"),
        Ok(TokenAmount::from_e8s(500_000_000))
    );
    assert_eq!(
        TokenAmount::parse_tokens("0.25"),
        Ok(TokenAmount::from_e8s(25_000_000))
    );
    assert_eq!(
        TokenAmount::parse_tokens(".00000001"),
        Ok(TokenAmount::from_e8s(1))
    );
    assert_eq!(
        TokenAmount::parse_tokens("12."),
        Ok(TokenAmount::from_e8s(1_200_000_000))
    );
}

#[test]
fn rejects_malformed_amounts() {
    assert_eq!(TokenAmount::parse_tokens(""), Err(AmountParseError::Empty));
    assert!(matches!(
        TokenAmount::parse_tokens("-1"),
        Err(AmountParseError::Malformed(_))
    ));
    assert!(matches!(
        TokenAmount::parse_tokens("1e3"),
        Err(AmountParseError::Malformed(_))
    ));
    assert!(matches!(
        TokenAmount::parse_tokens("."),
        Err(AmountParseError::Malformed(_))
    ));
    assert_eq!(
        TokenAmount::parse_tokens("0.123456789"),
        Err(AmountParseError::TooPrecise)
    );
    assert_eq!(
        TokenAmount::parse_tokens("184467440738"),
        Err(AmountParseError::Overflow)
    );
}

#[test]
fn displays_trimmed_token_amounts() {
    assert_eq!(TokenAmount::from_e8s(500_000_000).to_string(), "5");
    assert_eq!(TokenAmount::from_e8s(125_000_000).to_string(), "1.25");
    assert_eq!(TokenAmount::from_e8s(1).to_string(), "0.00000001");
}
