//! Day plan model
//!
//! A day plan ("meals in day") fills up to six fixed slots with meals and
//! a portion factor each. Loose products live in their own table, see
//! [`super::LooseProductAttachment`].

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::{DbError, DbResult};
use crate::nutrition::normalize;
use crate::nutrition::slots::{clamp_factor, MealSlot, DEFAULT_FACTOR};
use super::MealComposition;

/// One slot of a day: an optional meal snapshot and its portion factor
#[derive(Debug, Clone, PartialEq)]
pub struct DaySlot {
    pub meal: Option<MealComposition>,
    pub factor: f64,
}

impl Default for DaySlot {
    fn default() -> Self {
        Self { meal: None, factor: DEFAULT_FACTOR }
    }
}

impl DaySlot {
    pub fn with_meal(meal: MealComposition, factor: f64) -> Self {
        Self { meal: Some(meal), factor }
    }
}

/// A day plan with every filled slot resolved to a meal snapshot
///
/// On the wire this is the flat backend record: `breakfast` ..
/// `supper` hold meal objects (or null) and `factorBreakfast` ..
/// `factorSupper` the portion factors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct DayComposition {
    pub id: i64,
    pub name: String,
    pub for_5_days: bool,
    pub breakfast: DaySlot,
    pub second_breakfast: DaySlot,
    pub lunch: DaySlot,
    pub afternoon_snack: DaySlot,
    pub dinner: DaySlot,
    pub supper: DaySlot,
}

impl DayComposition {
    pub fn slot(&self, slot: MealSlot) -> &DaySlot {
        match slot {
            MealSlot::Breakfast => &self.breakfast,
            MealSlot::SecondBreakfast => &self.second_breakfast,
            MealSlot::Lunch => &self.lunch,
            MealSlot::AfternoonSnack => &self.afternoon_snack,
            MealSlot::Dinner => &self.dinner,
            MealSlot::Supper => &self.supper,
        }
    }

    pub fn slot_mut(&mut self, slot: MealSlot) -> &mut DaySlot {
        match slot {
            MealSlot::Breakfast => &mut self.breakfast,
            MealSlot::SecondBreakfast => &mut self.second_breakfast,
            MealSlot::Lunch => &mut self.lunch,
            MealSlot::AfternoonSnack => &mut self.afternoon_snack,
            MealSlot::Dinner => &mut self.dinner,
            MealSlot::Supper => &mut self.supper,
        }
    }

    /// Slots in display order
    pub fn slots(&self) -> impl Iterator<Item = (MealSlot, &DaySlot)> {
        MealSlot::ALL.into_iter().map(move |s| (s, self.slot(s)))
    }

    /// Number of slots holding a meal
    pub fn filled_slots(&self) -> usize {
        self.slots().filter(|(_, s)| s.meal.is_some()).count()
    }
}

impl From<Map<String, Value>> for DayComposition {
    fn from(map: Map<String, Value>) -> Self {
        let mut day = DayComposition {
            id: normalize::lenient_id(&map, &["id"]),
            name: normalize::lenient_string(&map, &["name"]).unwrap_or_default(),
            for_5_days: match map.get("for5Days") {
                Some(Value::Bool(b)) => *b,
                Some(v) => normalize::lenient_number(v).is_some_and(|n| n != 0.0),
                None => false,
            },
            ..Default::default()
        };

        for slot in MealSlot::ALL {
            let meal = match map.get(slot.key()) {
                Some(Value::Object(m)) => Some(MealComposition::from(m.clone())),
                _ => None,
            };
            let factor = normalize::first_number(&map, &[slot.factor_key()]).unwrap_or(DEFAULT_FACTOR);
            *day.slot_mut(slot) = DaySlot { meal, factor };
        }

        day
    }
}

impl From<DayComposition> for Map<String, Value> {
    fn from(day: DayComposition) -> Self {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::from(day.id));
        map.insert("name".to_string(), Value::from(day.name.clone()));
        map.insert("for5Days".to_string(), Value::from(day.for_5_days));

        for (slot, entry) in day.slots() {
            let meal = entry
                .meal
                .as_ref()
                .and_then(|m| serde_json::to_value(m).ok())
                .unwrap_or(Value::Null);
            map.insert(slot.key().to_string(), meal);
            map.insert(slot.factor_key().to_string(), Value::from(entry.factor));
        }

        map
    }
}

/// Assignment of one slot when creating or editing a day plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotAssignment {
    pub slot: MealSlot,
    /// Meal to place in the slot
    pub meal_id: Option<i64>,
    /// Portion factor, clamped into [0.1, 10]
    pub factor: Option<f64>,
    /// Empty the slot (ignored when `meal_id` is given)
    #[serde(default)]
    pub clear: bool,
}

/// Data for creating a day plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayPlanCreate {
    pub name: String,
    #[serde(default)]
    pub for_5_days: bool,
    #[serde(default)]
    pub slots: Vec<SlotAssignment>,
}

/// Data for updating a day plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayPlanUpdate {
    pub name: Option<String>,
    pub for_5_days: Option<bool>,
    #[serde(default)]
    pub slots: Vec<SlotAssignment>,
}

/// Day plan row with meal ids instead of snapshots
#[derive(Debug, Clone, Serialize)]
pub struct DayPlanRecord {
    pub id: i64,
    pub name: String,
    pub for_5_days: bool,
    pub meal_ids: [Option<i64>; 6],
    pub factors: [f64; 6],
}

impl DayPlanRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let mut meal_ids = [None; 6];
        let mut factors = [DEFAULT_FACTOR; 6];
        for (i, slot) in MealSlot::ALL.iter().enumerate() {
            meal_ids[i] = row.get(format!("{}_meal_id", slot.column()).as_str())?;
            factors[i] = row.get(format!("factor_{}", slot.column()).as_str())?;
        }

        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            for_5_days: row.get::<_, i32>("for_5_days")? != 0,
            meal_ids,
            factors,
        })
    }

    fn load(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM meals_in_day WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve meal ids to snapshots
    pub fn into_composition(self, conn: &Connection) -> DbResult<DayComposition> {
        let mut day = DayComposition {
            id: self.id,
            name: self.name,
            for_5_days: self.for_5_days,
            ..Default::default()
        };

        for (i, slot) in MealSlot::ALL.into_iter().enumerate() {
            let meal = match self.meal_ids[i] {
                Some(meal_id) => MealComposition::get_by_id(conn, meal_id)?,
                None => None,
            };
            *day.slot_mut(slot) = DaySlot { meal, factor: self.factors[i] };
        }

        Ok(day)
    }
}

fn check_assignments(conn: &Connection, slots: &[SlotAssignment]) -> DbResult<()> {
    for assignment in slots {
        if let Some(meal_id) = assignment.meal_id {
            if MealComposition::get_by_id(conn, meal_id)?.is_none() {
                return Err(DbError::NotFound { entity: "Meal", id: meal_id });
            }
        }
    }
    Ok(())
}

/// Column updates for a set of slot assignments
fn assignment_updates(
    slots: &[SlotAssignment],
    updates: &mut Vec<String>,
    params_vec: &mut Vec<Box<dyn rusqlite::ToSql>>,
) {
    for assignment in slots {
        let column = assignment.slot.column();

        if let Some(meal_id) = assignment.meal_id {
            updates.push(format!("{}_meal_id = ?{}", column, params_vec.len() + 1));
            params_vec.push(Box::new(meal_id));
        } else if assignment.clear {
            updates.push(format!("{}_meal_id = NULL", column));
        }

        if let Some(factor) = assignment.factor {
            updates.push(format!("factor_{} = ?{}", column, params_vec.len() + 1));
            params_vec.push(Box::new(clamp_factor(factor)));
        }
    }
}

impl DayComposition {
    /// Insert a new day plan
    pub fn create(conn: &Connection, data: &DayPlanCreate) -> DbResult<Self> {
        if data.name.trim().is_empty() {
            return Err(DbError::Validation("Day plan name is required".to_string()));
        }
        check_assignments(conn, &data.slots)?;

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO meals_in_day (name, for_5_days) VALUES (?1, ?2)",
            rusqlite::params![data.name.trim(), data.for_5_days as i32],
        )?;
        let id = tx.last_insert_rowid();

        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        assignment_updates(&data.slots, &mut updates, &mut params_vec);

        if !updates.is_empty() {
            let sql = format!(
                "UPDATE meals_in_day SET {} WHERE id = ?{}",
                updates.join(", "),
                params_vec.len() + 1
            );
            params_vec.push(Box::new(id));
            let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
            tx.execute(&sql, params_refs.as_slice())?;
        }

        tx.commit()?;

        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound { entity: "Day plan", id })
    }

    /// Get a day plan with meal snapshots
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        match DayPlanRecord::load(conn, id)? {
            Some(record) => Ok(Some(record.into_composition(conn)?)),
            None => Ok(None),
        }
    }

    /// List day plans with optional name search
    pub fn list(
        conn: &Connection,
        query: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Self>> {
        let mut sql = String::from("SELECT * FROM meals_in_day WHERE 1=1");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(q) = query.filter(|q| !q.trim().is_empty()) {
            params_vec.push(Box::new(format!("%{}%", q.trim())));
            sql.push_str(&format!(" AND name LIKE ?{}", params_vec.len()));
        }

        sql.push_str(" ORDER BY name COLLATE NOCASE");

        params_vec.push(Box::new(limit));
        sql.push_str(&format!(" LIMIT ?{}", params_vec.len()));

        params_vec.push(Box::new(offset));
        sql.push_str(&format!(" OFFSET ?{}", params_vec.len()));

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let records = stmt
            .query_map(params_refs.as_slice(), DayPlanRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        records
            .into_iter()
            .map(|record| record.into_composition(conn))
            .collect()
    }

    /// Update a day plan; factor edits are clamped into [0.1, 10]
    pub fn update(conn: &Connection, id: i64, data: &DayPlanUpdate) -> DbResult<Option<Self>> {
        if DayPlanRecord::load(conn, id)?.is_none() {
            return Ok(None);
        }
        check_assignments(conn, &data.slots)?;

        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            if name.trim().is_empty() {
                return Err(DbError::Validation("Day plan name is required".to_string()));
            }
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.trim().to_string()));
        }
        if let Some(for_5_days) = data.for_5_days {
            updates.push(format!("for_5_days = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(for_5_days as i32));
        }
        assignment_updates(&data.slots, &mut updates, &mut params_vec);

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE meals_in_day SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Delete a day plan and its loose products
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM meals_in_day WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
