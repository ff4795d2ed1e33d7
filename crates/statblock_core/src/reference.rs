//! Calibration queries over a table of published reference creatures.
//!
//! Size and creature type are multi-valued. Before filtering, a row is
//! exploded into one copy per value it holds in every multi-valued column the
//! query touches, so a row tagged `Large, Huge` counts once in the `Large`
//! bucket and once in the `Huge` bucket, never twice in either.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ability::{Ability, DEFAULT_SCORE};
use crate::challenge_rating::Rating;
use crate::core_api::{CoreError, CoreErrorCode};
use crate::vocab::{CreatureType, Size, statblock_enum};

statblock_enum!(Column {
    MonsterName => "Monster Name",
    Cr => "CR",
    Ac => "AC",
    MinHp => "Min HP",
    MaxHp => "Max HP",
    AvgHp => "Avg HP",
    NumberOfAttacks => "Number of Attacks",
    Size => "Size",
    CreatureType => "Creature Type",
    Str => "STR",
    Dex => "DEX",
    Con => "CON",
    Int => "INT",
    Wis => "WIS",
    Cha => "CHA",
    Legendary => "Legendary",
    Swarm => "Swarm",
});

impl Column {
    pub fn is_multi_valued(self) -> bool {
        matches!(self, Column::Size | Column::CreatureType)
    }

    pub fn is_numeric(self) -> bool {
        !matches!(
            self,
            Column::MonsterName
                | Column::Size
                | Column::CreatureType
                | Column::Legendary
                | Column::Swarm
        )
    }

    fn ability(self) -> Option<Ability> {
        match self {
            Column::Str => Some(Ability::Strength),
            Column::Dex => Some(Ability::Dexterity),
            Column::Con => Some(Ability::Constitution),
            Column::Int => Some(Ability::Intelligence),
            Column::Wis => Some(Ability::Wisdom),
            Column::Cha => Some(Ability::Charisma),
            _ => None,
        }
    }
}

impl FromStr for Column {
    type Err = CoreError;

    /// Accepts the display name ("Avg HP") or the stable name ("AVG_HP").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::from_display_name(wanted)
            .or_else(|| {
                Self::ALL.iter().copied().find(|c| {
                    c.display_name()
                        .replace(' ', "_")
                        .eq_ignore_ascii_case(wanted)
                })
            })
            .ok_or_else(|| CoreError::configuration(format!("unknown reference column {s:?}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Mean,
    Median,
    Mode,
    Min,
    Max,
}

impl Aggregate {
    pub const ALL: [Aggregate; 5] = [
        Aggregate::Mean,
        Aggregate::Median,
        Aggregate::Mode,
        Aggregate::Min,
        Aggregate::Max,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Aggregate::Mean => "mean",
            Aggregate::Median => "median",
            Aggregate::Mode => "mode",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
        }
    }

    /// `values` must be non-empty.
    fn apply(self, values: &mut [f64]) -> f64 {
        values.sort_by(f64::total_cmp);
        let n = values.len();
        match self {
            Aggregate::Mean => values.iter().sum::<f64>() / n as f64,
            Aggregate::Median if n % 2 == 1 => values[n / 2],
            Aggregate::Median => (values[n / 2 - 1] + values[n / 2]) / 2.0,
            Aggregate::Min => values[0],
            Aggregate::Max => values[n - 1],
            // Sorted ascending, so the first longest run is the smallest mode.
            Aggregate::Mode => {
                let mut best = (values[0], 0usize);
                let mut start = 0;
                while start < n {
                    let end = values[start..]
                        .iter()
                        .position(|v| *v != values[start])
                        .map_or(n, |offset| start + offset);
                    if end - start > best.1 {
                        best = (values[start], end - start);
                    }
                    start = end;
                }
                best.0
            }
        }
    }
}

impl FromStr for Aggregate {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CoreError::configuration(format!("unknown aggregate operation {s:?}")))
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceRow {
    pub name: String,
    pub challenge_rating: Rating,
    pub armor_class: i32,
    pub min_hp: i32,
    pub max_hp: i32,
    pub avg_hp: i32,
    pub attacks: u32,
    pub sizes: Vec<Size>,
    pub creature_types: Vec<CreatureType>,
    #[serde(default)]
    pub ability_scores: BTreeMap<Ability, i32>,
    #[serde(default)]
    pub legendary: bool,
    #[serde(default)]
    pub swarm: bool,
}

impl ReferenceRow {
    /// Every value the row holds in `column`, deduplicated.
    fn cells(&self, column: Column) -> Vec<Cell> {
        let number = |n: i32| vec![Cell::Number(f64::from(n))];
        match column {
            Column::MonsterName => vec![Cell::Text(self.name.clone())],
            Column::Cr => vec![Cell::Rating(self.challenge_rating)],
            Column::Ac => number(self.armor_class),
            Column::MinHp => number(self.min_hp),
            Column::MaxHp => number(self.max_hp),
            Column::AvgHp => number(self.avg_hp),
            Column::NumberOfAttacks => vec![Cell::Number(f64::from(self.attacks))],
            Column::Size => dedup(self.sizes.iter().map(|&s| Cell::Size(s))),
            Column::CreatureType => {
                dedup(self.creature_types.iter().map(|&t| Cell::CreatureType(t)))
            }
            Column::Legendary => vec![Cell::Flag(self.legendary)],
            Column::Swarm => vec![Cell::Flag(self.swarm)],
            Column::Str | Column::Dex | Column::Con | Column::Int | Column::Wis | Column::Cha => {
                let score = column
                    .ability()
                    .and_then(|a| self.ability_scores.get(&a).copied())
                    .unwrap_or(DEFAULT_SCORE);
                number(score)
            }
        }
    }
}

fn dedup(cells: impl Iterator<Item = Cell>) -> Vec<Cell> {
    let mut out: Vec<Cell> = Vec::new();
    for cell in cells {
        if !out.contains(&cell) {
            out.push(cell);
        }
    }
    out
}

/// A filter operand. Text is coerced to the column's type, so `"Large"`
/// works for `Size` and `"1/2"` for `CR`.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Flag(bool),
    Number(f64),
    Text(String),
    Rating(Rating),
    Size(Size),
    CreatureType(CreatureType),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Flag(b) => write!(f, "{b}"),
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::Text(t) => f.write_str(t),
            FilterValue::Rating(r) => write!(f, "{r}"),
            FilterValue::Size(s) => write!(f, "{s}"),
            FilterValue::CreatureType(t) => write!(f, "{t}"),
        }
    }
}

pub type Filters = BTreeMap<Column, FilterValue>;

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Rating(Rating),
    Number(f64),
    Flag(bool),
    Size(Size),
    CreatureType(CreatureType),
}

impl Cell {
    fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Rating(r) => Some(r.as_f64()),
            _ => None,
        }
    }

    fn compare(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
            (Cell::Flag(a), Cell::Flag(b)) => a.cmp(b),
            (Cell::Size(a), Cell::Size(b)) => a.cmp(b),
            (Cell::CreatureType(a), Cell::CreatureType(b)) => a.cmp(b),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => Ordering::Equal,
            },
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(t) => f.write_str(t),
            Cell::Rating(r) => write!(f, "{r}"),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Flag(b) => write!(f, "{b}"),
            Cell::Size(s) => write!(f, "{s}"),
            Cell::CreatureType(t) => write!(f, "{t}"),
        }
    }
}

fn coerce(column: Column, value: &FilterValue) -> Result<Cell, CoreError> {
    let mismatch = || {
        CoreError::configuration(format!(
            "filter value {value:?} does not fit column {}",
            column.display_name()
        ))
    };
    let cell = match (column, value) {
        (Column::MonsterName, FilterValue::Text(t)) => Cell::Text(t.clone()),
        (Column::Cr, FilterValue::Rating(r)) => Cell::Rating(*r),
        (Column::Cr, FilterValue::Number(n)) => Cell::Rating(Rating::from_f64(*n)?),
        (Column::Cr, FilterValue::Text(t)) => Cell::Rating(t.parse()?),
        (Column::Size, FilterValue::Size(s)) => Cell::Size(*s),
        (Column::Size, FilterValue::Text(t)) => {
            Cell::Size(Size::from_display_name(t).ok_or_else(mismatch)?)
        }
        (Column::CreatureType, FilterValue::CreatureType(t)) => Cell::CreatureType(*t),
        (Column::CreatureType, FilterValue::Text(t)) => {
            Cell::CreatureType(CreatureType::from_display_name(t).ok_or_else(mismatch)?)
        }
        (Column::Legendary | Column::Swarm, FilterValue::Flag(b)) => Cell::Flag(*b),
        (Column::Legendary | Column::Swarm, FilterValue::Number(n)) if *n == 0.0 || *n == 1.0 => {
            Cell::Flag(*n == 1.0)
        }
        (Column::Legendary | Column::Swarm, FilterValue::Text(t)) => {
            match t.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Cell::Flag(true),
                "false" | "no" | "0" => Cell::Flag(false),
                _ => return Err(mismatch()),
            }
        }
        (c, FilterValue::Number(n)) if c.is_numeric() => Cell::Number(*n),
        (c, FilterValue::Text(t)) if c.is_numeric() => {
            Cell::Number(t.trim().parse::<f64>().map_err(|_| mismatch())?)
        }
        _ => return Err(mismatch()),
    };
    Ok(cell)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QueryResult {
    pub value: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResult {
    pub key: String,
    pub result: QueryResult,
}

/// One exploded copy of a row: the row plus the single value picked for each
/// multi-valued column in play.
struct Exploded<'a> {
    row: &'a ReferenceRow,
    picks: BTreeMap<Column, Cell>,
}

impl Exploded<'_> {
    fn cell(&self, column: Column) -> Vec<Cell> {
        match self.picks.get(&column) {
            Some(cell) => vec![cell.clone()],
            None => self.row.cells(column),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceTable {
    rows: Vec<ReferenceRow>,
}

impl ReferenceTable {
    pub fn new(rows: Vec<ReferenceRow>) -> Self {
        Self { rows }
    }

    /// Reads a JSON array of rows.
    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        serde_json::from_str(text).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Serialization,
                format!("invalid reference table: {e}"),
            )
        })
    }

    pub fn rows(&self) -> &[ReferenceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn query(
        &self,
        filters: &Filters,
        target: Column,
        op: Aggregate,
    ) -> Result<QueryResult, CoreError> {
        ensure_numeric(target)?;
        let matched = self.matching(filters, None)?;
        let mut values = target_values(&matched, target);
        if values.is_empty() {
            return Err(no_rows(filters));
        }
        let result = QueryResult {
            value: op.apply(&mut values),
            sample_size: values.len(),
        };
        debug!(
            filters = %describe(filters),
            target = target.display_name(),
            op = op.name(),
            value = result.value,
            sample_size = result.sample_size,
            "reference query"
        );
        Ok(result)
    }

    /// One aggregate per value of `group_column` among the matching rows,
    /// ordered by that value.
    pub fn group_by(
        &self,
        filters: &Filters,
        group_column: Column,
        target: Column,
        op: Aggregate,
    ) -> Result<Vec<GroupResult>, CoreError> {
        ensure_numeric(target)?;
        let matched = self.matching(filters, Some(group_column))?;

        let mut groups: Vec<(Cell, Vec<Exploded<'_>>)> = Vec::new();
        for entry in matched {
            for key in entry.cell(group_column) {
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, members)) => members.push(Exploded {
                        row: entry.row,
                        picks: entry.picks.clone(),
                    }),
                    None => groups.push((
                        key,
                        vec![Exploded {
                            row: entry.row,
                            picks: entry.picks.clone(),
                        }],
                    )),
                }
            }
        }
        if groups.is_empty() {
            return Err(no_rows(filters));
        }
        groups.sort_by(|(a, _), (b, _)| a.compare(b));

        let results = groups
            .into_iter()
            .map(|(key, members)| {
                let mut values = target_values(&members, target);
                GroupResult {
                    key: key.to_string(),
                    result: QueryResult {
                        value: op.apply(&mut values),
                        sample_size: values.len(),
                    },
                }
            })
            .collect::<Vec<_>>();
        debug!(
            filters = %describe(filters),
            group = group_column.display_name(),
            groups = results.len(),
            "reference group query"
        );
        Ok(results)
    }

    /// Explodes on every multi-valued column in `filters` (plus `extra`) and
    /// keeps the copies whose picks equal the filter values.
    fn matching(
        &self,
        filters: &Filters,
        extra: Option<Column>,
    ) -> Result<Vec<Exploded<'_>>, CoreError> {
        let wanted = filters
            .iter()
            .map(|(&column, value)| coerce(column, value).map(|cell| (column, cell)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut explode_on: Vec<Column> = wanted
            .iter()
            .map(|(column, _)| *column)
            .filter(|c| c.is_multi_valued())
            .collect();
        if let Some(column) = extra.filter(|c| c.is_multi_valued() && !explode_on.contains(c)) {
            explode_on.push(column);
        }

        let mut out = Vec::new();
        for row in &self.rows {
            let mut copies = vec![BTreeMap::new()];
            for &column in &explode_on {
                copies = copies
                    .into_iter()
                    .flat_map(|picks: BTreeMap<Column, Cell>| {
                        row.cells(column).into_iter().map(move |cell| {
                            let mut picks = picks.clone();
                            picks.insert(column, cell);
                            picks
                        })
                    })
                    .collect();
            }
            for picks in copies {
                let entry = Exploded { row, picks };
                if wanted
                    .iter()
                    .all(|(column, cell)| entry.cell(*column).iter().all(|c| c == cell))
                {
                    out.push(entry);
                }
            }
        }
        Ok(out)
    }
}

fn target_values(entries: &[Exploded<'_>], target: Column) -> Vec<f64> {
    entries
        .iter()
        .filter_map(|entry| entry.cell(target).first().and_then(Cell::as_number))
        .collect()
}

fn ensure_numeric(target: Column) -> Result<(), CoreError> {
    if target.is_numeric() {
        Ok(())
    } else {
        Err(CoreError::configuration(format!(
            "column {} cannot be aggregated",
            target.display_name()
        )))
    }
}

fn describe(filters: &Filters) -> String {
    if filters.is_empty() {
        return "(no filters)".to_string();
    }
    filters
        .iter()
        .map(|(column, value)| format!("{}={value}", column.display_name()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn no_rows(filters: &Filters) -> CoreError {
    let description = describe(filters);
    warn!(filters = %description, "reference query matched no rows");
    CoreError::not_found(format!("no reference rows match {description}"))
}
