use std::collections::HashMap;

pub const WEAPONS: &str = include_str!("../content/weapons.json");
pub const SPELLS: &str = include_str!("../content/spells.json");
pub const BESTIARY: &str = include_str!("../content/bestiary.json");
pub const PARTY: &str = include_str!("../content/party.json");

pub fn builtin_encounters() -> HashMap<&'static str, &'static str> {
    HashMap::from([(
        "goblin_ambush",
        include_str!("../content/goblin_ambush.json"),
    )])
}
