//! Built-in item schemas and JSON shape coercion.
//!
//! Every merge run reads rows against one of three fixed schemas. Coercion is
//! forgiving: a missing field or a value of the wrong shape becomes `null`
//! rather than failing the row, so one malformed attribute never discards an
//! otherwise usable record.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::errors::MergeError;

/// One parsed data row, keyed by schema field name.
///
/// With `serde_json`'s `preserve_order` feature the map retains insertion
/// order, so coerced rows keep their schema's column order.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Int,
    Float,
    Bool,
    List(Box<FieldType>),
    Struct(Vec<Field>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
}

/// Ordered collection of named fields describing one item type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Coerce a parsed JSON value into a row with exactly this schema's
    /// fields, in schema order.
    ///
    /// Returns `None` when the value is not a JSON object. Unknown input
    /// fields are discarded; missing or mismatched fields become `null`.
    pub fn coerce_row(&self, value: Value) -> Option<Record> {
        let Value::Object(mut raw) = value else {
            return None;
        };
        let mut row = Record::new();
        for field in &self.fields {
            let coerced = raw
                .remove(field.name)
                .map_or(Value::Null, |v| coerce_value(&field.ty, v));
            row.insert(field.name.to_owned(), coerced);
        }
        Some(row)
    }
}

fn coerce_value(ty: &FieldType, value: Value) -> Value {
    match (ty, value) {
        (_, Value::Null) => Value::Null,
        (FieldType::Str, v @ Value::String(_)) => v,
        // Whole numbers only; fractional input is a shape mismatch.
        (FieldType::Int, Value::Number(n)) => n.as_i64().map_or(Value::Null, Value::from),
        (FieldType::Float, Value::Number(n)) => n.as_f64().map_or(Value::Null, Value::from),
        (FieldType::Bool, v @ Value::Bool(_)) => v,
        (FieldType::List(inner), Value::Array(items)) => Value::Array(
            items
                .into_iter()
                .map(|item| coerce_value(inner, item))
                .collect(),
        ),
        (FieldType::Struct(fields), Value::Object(mut raw)) => {
            let mut out = Map::new();
            for field in fields {
                let coerced = raw
                    .remove(field.name)
                    .map_or(Value::Null, |v| coerce_value(&field.ty, v));
                out.insert(field.name.to_owned(), coerced);
            }
            Value::Object(out)
        }
        _ => Value::Null,
    }
}

/// The item types a feed directory may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Game,
    User,
    Rating,
}

impl ItemType {
    /// Feed directory / CLI spelling of the item type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Game => "GameItem",
            Self::User => "UserItem",
            Self::Rating => "RatingItem",
        }
    }

    pub fn schema(self) -> Schema {
        match self {
            Self::Game => game_item_schema(),
            Self::User => user_item_schema(),
            Self::Rating => rating_item_schema(),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GameItem" => Ok(Self::Game),
            "UserItem" => Ok(Self::User),
            "RatingItem" => Ok(Self::Rating),
            other => Err(MergeError::UnknownItemType(other.to_owned())),
        }
    }
}

fn field(name: &'static str, ty: FieldType) -> Field {
    Field { name, ty }
}

fn str_field(name: &'static str) -> Field {
    field(name, FieldType::Str)
}

fn int_field(name: &'static str) -> Field {
    field(name, FieldType::Int)
}

fn float_field(name: &'static str) -> Field {
    field(name, FieldType::Float)
}

fn bool_field(name: &'static str) -> Field {
    field(name, FieldType::Bool)
}

fn list_field(name: &'static str, inner: FieldType) -> Field {
    field(name, FieldType::List(Box::new(inner)))
}

fn str_list(name: &'static str) -> Field {
    list_field(name, FieldType::Str)
}

fn int_list(name: &'static str) -> Field {
    list_field(name, FieldType::Int)
}

/// Downloaded artefact reference shared by image and rules fields.
fn file_struct() -> FieldType {
    FieldType::Struct(vec![
        str_field("url"),
        str_field("path"),
        str_field("checksum"),
    ])
}

fn blurhash_struct() -> FieldType {
    FieldType::Struct(vec![
        str_field("url"),
        str_field("path"),
        str_field("checksum"),
        str_field("blurhash"),
    ])
}

fn game_item_schema() -> Schema {
    Schema {
        fields: vec![
            str_field("name"),
            str_list("alt_name"),
            int_field("year"),
            str_list("game_type"),
            str_field("description"),
            str_list("designer"),
            str_list("artist"),
            str_list("publisher"),
            str_field("url"),
            str_list("official_url"),
            str_list("image_url"),
            str_list("image_url_download"),
            list_field("image_file", file_struct()),
            list_field("image_blurhash", blurhash_struct()),
            str_list("video_url"),
            str_list("rules_url"),
            list_field("rules_file", file_struct()),
            str_list("review_url"),
            str_list("external_link"),
            str_field("list_price"),
            int_field("min_players"),
            int_field("max_players"),
            int_field("min_players_rec"),
            int_field("max_players_rec"),
            int_field("min_players_best"),
            int_field("max_players_best"),
            int_field("min_age"),
            int_field("max_age"),
            float_field("min_age_rec"),
            float_field("max_age_rec"),
            int_field("min_time"),
            int_field("max_time"),
            str_list("category"),
            str_list("mechanic"),
            bool_field("cooperative"),
            bool_field("compilation"),
            str_list("family"),
            str_list("expansion"),
            int_list("implementation"),
            int_list("integration"),
            int_field("rank"),
            list_field(
                "add_rank",
                FieldType::Struct(vec![
                    str_field("game_type"),
                    int_field("game_type_id"),
                    str_field("name"),
                    int_field("rank"),
                    float_field("bayes_rating"),
                ]),
            ),
            int_field("num_votes"),
            float_field("avg_rating"),
            float_field("stddev_rating"),
            float_field("bayes_rating"),
            int_field("worst_rating"),
            int_field("best_rating"),
            float_field("complexity"),
            int_field("easiest_complexity"),
            int_field("hardest_complexity"),
            float_field("language_dependency"),
            int_field("lowest_language_dependency"),
            int_field("highest_language_dependency"),
            int_field("bgg_id"),
            str_field("freebase_id"),
            str_field("wikidata_id"),
            str_field("wikipedia_id"),
            str_field("dbpedia_id"),
            int_field("luding_id"),
            str_field("spielen_id"),
            str_field("published_at"),
            str_field("updated_at"),
            str_field("scraped_at"),
        ],
    }
}

fn user_item_schema() -> Schema {
    Schema {
        fields: vec![
            int_field("item_id"),
            str_field("bgg_user_name"),
            str_field("first_name"),
            str_field("last_name"),
            int_field("registered"),
            str_field("last_login"),
            str_field("country"),
            str_field("region"),
            str_field("city"),
            str_list("external_link"),
            str_list("image_url"),
            str_list("image_url_download"),
            list_field("image_file", file_struct()),
            list_field("image_blurhash", blurhash_struct()),
            str_field("published_at"),
            str_field("updated_at"),
            str_field("scraped_at"),
        ],
    }
}

fn rating_item_schema() -> Schema {
    Schema {
        fields: vec![
            str_field("item_id"),
            int_field("bgg_id"),
            str_field("bgg_user_name"),
            float_field("bgg_user_rating"),
            bool_field("bgg_user_owned"),
            bool_field("bgg_user_prev_owned"),
            bool_field("bgg_user_for_trade"),
            bool_field("bgg_user_want_in_trade"),
            bool_field("bgg_user_want_to_play"),
            bool_field("bgg_user_want_to_buy"),
            bool_field("bgg_user_preordered"),
            int_field("bgg_user_wishlist"),
            int_field("bgg_user_play_count"),
            str_field("comment"),
            str_field("published_at"),
            str_field("updated_at"),
            str_field("scraped_at"),
        ],
    }
}
