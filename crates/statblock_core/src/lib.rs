pub mod ability;
pub mod challenge_rating;
pub mod characteristic;
pub mod core_api;
pub mod dice;
pub mod hit_dice;
pub mod keywords;
pub mod macros;
pub mod reference;
pub mod statblock;
pub mod templates;
pub mod vocab;
