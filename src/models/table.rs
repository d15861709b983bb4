use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Стол на мероприятии.
///
/// `capacity` хранит количество *свободных* мест в данный момент,
/// а не исходный размер стола: его уменьшает заселение гостя и
/// увеличивает его уход.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Table {
    pub id: i64,
    pub capacity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTable {
    pub capacity: i64,
}
