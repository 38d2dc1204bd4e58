use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

use crate::errors::LeaderboardError;
use crate::{
    parse_round_id,
    Address,
    LeaderboardEntry,
    LeaderboardRecord,
    PrizeSummary,
    RoundId,
    RoundPrizes,
    TicketDetailValue,
    TicketPrize,
    U256,
};

#[test]
fn leaderboard_record_uses_camel_case_entries() {
    let record = LeaderboardRecord {
        data: vec![LeaderboardEntry {
            ticket_number: 4,
            rank: 1,
            owner: Address::repeat_byte(0x11),
            prize: "25.000000".to_owned(),
        }],
        round: 9,
        timestamp: 1_700_000_000_000,
    };

    let value = serde_json::to_value(&record).unwrap();

    assert_eq!(value["data"][0]["ticketNumber"], json!(4));
    assert_eq!(value["data"][0]["prize"], json!("25.000000"));
    assert_eq!(value["round"], json!(9));
    assert_eq!(serde_json::from_value::<LeaderboardRecord>(value).unwrap(), record);
}

#[test]
fn prize_summary_field_names() {
    let summary = PrizeSummary {
        found_prizes: true,
        total_pending_claims: "15.000000".to_owned(),
        prizes: vec![RoundPrizes {
            round_id: 3,
            user_tickets: 2,
            round_prizes: vec![TicketPrize {
                ticket_number: 7,
                rank: 3,
                prize: "15.000000".to_owned(),
            }],
            total_round_prize: "15.000000".to_owned(),
            is_already_claimed: false,
            best_rank: 3,
        }],
    };

    let value = serde_json::to_value(&summary).unwrap();

    assert_eq!(value["foundPrizes"], json!(true));
    assert_eq!(value["totalPendingClaims"], json!("15.000000"));
    assert_eq!(value["prizes"][0]["roundPrizes"][0]["ticketNumber"], json!(7));
    assert_eq!(value["prizes"][0]["isAlreadyClaimed"], json!(false));
    assert_eq!(value["prizes"][0]["bestRank"], json!(3));
}

#[test]
fn ticket_detail_value_kind() {
    assert_eq!(TicketDetailValue::Rank(2).kind().to_string(), "rank");
    assert_eq!(TicketDetailValue::Prize(U256::from(5)).kind().to_string(), "prize");
}

#[rstest]
#[case::missing(None, Err(LeaderboardError::MissingRoundId))]
#[case::empty(Some(""), Err(LeaderboardError::MissingRoundId))]
#[case::not_a_number(Some("abc"), Err(LeaderboardError::InvalidRoundId { raw: "abc".to_owned() }))]
#[case::zero(Some("0"), Err(LeaderboardError::InvalidRoundId { raw: "0".to_owned() }))]
#[case::negative(Some("-3"), Err(LeaderboardError::InvalidRoundId { raw: "-3".to_owned() }))]
#[case::fraction(Some("1.5"), Err(LeaderboardError::InvalidRoundId { raw: "1.5".to_owned() }))]
#[case::valid(Some("12"), Ok(12))]
fn parses_round_id(
    #[case] raw: Option<&str>,
    #[case] expected: Result<RoundId, LeaderboardError>,
) {
    assert_eq!(parse_round_id(raw), expected);
}
