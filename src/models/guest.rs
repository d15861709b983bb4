use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Формат времени прибытия в ответах API: только часы и минуты.
pub const ARRIVAL_TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Guest {
    pub id: i64,
    /// Уникальное имя, по нему ищем гостя.
    pub name: String,
    pub table_id: i64,
    /// Сопровождающие, без самого гостя.
    pub accompanying_guests: i64,
    pub arrival_time: Option<NaiveDateTime>,
}

/// Жизненный цикл гостя: приглашён -> пришёл -> (удалён при уходе).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestStatus {
    Invited,
    Arrived,
}

impl GuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestStatus::Invited => "invited",
            GuestStatus::Arrived => "arrived",
        }
    }
}

impl std::fmt::Display for GuestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Guest {
    pub fn status(&self) -> GuestStatus {
        if self.arrival_time.is_some() {
            GuestStatus::Arrived
        } else {
            GuestStatus::Invited
        }
    }

    /// Сколько мест гость занимает вместе с компанией.
    pub fn seats_needed(&self) -> Option<i64> {
        seats_needed(self.accompanying_guests)
    }

    pub fn time_arrived(&self) -> Option<String> {
        self.arrival_time
            .map(|t| t.format(ARRIVAL_TIME_FORMAT).to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGuest {
    pub name: String,
    pub table_id: i64,
    pub accompanying_guests: i64,
}

/// Сам гость плюс сопровождающие. `None` при переполнении.
pub fn seats_needed(accompanying_guests: i64) -> Option<i64> {
    accompanying_guests.checked_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn guest(arrival_time: Option<NaiveDateTime>) -> Guest {
        Guest {
            id: 1,
            name: "John".to_string(),
            table_id: 1,
            accompanying_guests: 8,
            arrival_time,
        }
    }

    #[test]
    fn status_follows_arrival_time() {
        assert_eq!(guest(None).status(), GuestStatus::Invited);

        let at = NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(21, 5, 42)
            .unwrap();
        assert_eq!(guest(Some(at)).status(), GuestStatus::Arrived);
    }

    #[test]
    fn time_arrived_has_minute_precision() {
        let at = NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(9, 7, 59)
            .unwrap();
        assert_eq!(guest(Some(at)).time_arrived().as_deref(), Some("09:07"));
        assert_eq!(guest(None).time_arrived(), None);
    }

    #[test]
    fn seats_needed_counts_the_named_guest() {
        assert_eq!(seats_needed(0), Some(1));
        assert_eq!(guest(None).seats_needed(), Some(9));
        assert_eq!(seats_needed(i64::MAX), None);
    }
}
