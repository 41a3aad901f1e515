use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Element id of the only virus definition; spread synthesizes new instances from it.
pub const VIRUS_ELEMENT_ID: &str = "VIRUS1";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CardCategory {
    Virus,
    Resource,
    Advantage,
    Disadvantage,
}

/// What a card does when it resolves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    ContainVirus,
    DestroyVirusToken,
    IncrementVirusToken,
    PreventFromNeighborInfection,
    PreventCardAction,
}

impl ActionKind {
    /// Passive actions are only consulted by other rules and never resolve on their own.
    pub fn is_passive(self) -> bool {
        matches!(
            self,
            ActionKind::PreventFromNeighborInfection | ActionKind::PreventCardAction
        )
    }
}

/// Immutable card blueprint owned by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardDefinition {
    pub element_id: String,
    pub category: CardCategory,
    pub name: String,
    pub description: String,
    pub action: ActionKind,
    pub max_tokens_impact: u32,
    pub max_cards_impact: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub impacted_elements: Vec<String>,
}

impl CardDefinition {
    pub fn new(
        element_id: impl Into<String>,
        category: CardCategory,
        name: impl Into<String>,
        description: impl Into<String>,
        action: ActionKind,
    ) -> Self {
        Self {
            element_id: element_id.into(),
            category,
            name: name.into(),
            description: description.into(),
            action,
            max_tokens_impact: 0,
            max_cards_impact: 0,
            impacted_elements: Vec::new(),
        }
    }

    pub fn with_impact(mut self, max_tokens_impact: u32, max_cards_impact: usize) -> Self {
        self.max_tokens_impact = max_tokens_impact;
        self.max_cards_impact = max_cards_impact;
        self
    }

    pub fn impacting(mut self, elements: &[&str]) -> Self {
        self.impacted_elements = elements.iter().map(|element| element.to_string()).collect();
        self
    }

    pub fn impacts(&self, element_id: &str) -> bool {
        self.impacted_elements
            .iter()
            .any(|element| element == element_id)
    }
}

static CATALOG: Lazy<Vec<CardDefinition>> = Lazy::new(build_catalog);

fn build_catalog() -> Vec<CardDefinition> {
    use ActionKind::*;
    use CardCategory::*;

    vec![
        CardDefinition::new(
            VIRUS_ELEMENT_ID,
            Virus,
            "Virus",
            "Infectious killing virus, initial stage",
            IncrementVirusToken,
        )
        .with_impact(1, 1),
        CardDefinition::new(
            "R1",
            Resource,
            "Social Distancing",
            "Prevent a virus card from incrementing tokens",
            ContainVirus,
        )
        .with_impact(0, 1)
        .impacting(&[VIRUS_ELEMENT_ID]),
        CardDefinition::new(
            "R2",
            Resource,
            "Quarantine/Lockdown",
            "Prevent three virus cards from incrementing tokens",
            ContainVirus,
        )
        .with_impact(0, 3)
        .impacting(&[VIRUS_ELEMENT_ID]),
        CardDefinition::new(
            "R3",
            Resource,
            "Masks and Ventilators",
            "Destroy one virus token",
            DestroyVirusToken,
        )
        .with_impact(1, 1)
        .impacting(&[VIRUS_ELEMENT_ID]),
        CardDefinition::new(
            "R4",
            Resource,
            "Medics",
            "Destroy three virus tokens",
            DestroyVirusToken,
        )
        .with_impact(3, 1)
        .impacting(&[VIRUS_ELEMENT_ID]),
        CardDefinition::new(
            "A1",
            Advantage,
            "Educated Population",
            "Each round prevents a virus card from incrementing tokens",
            ContainVirus,
        )
        .with_impact(0, 1)
        .impacting(&[VIRUS_ELEMENT_ID]),
        CardDefinition::new(
            "A2",
            Advantage,
            "Public Health System",
            "Each round prevents three virus cards from incrementing tokens",
            ContainVirus,
        )
        .with_impact(0, 3)
        .impacting(&[VIRUS_ELEMENT_ID]),
        CardDefinition::new(
            "A3",
            Advantage,
            "Advanced Research Labs",
            "Each round destroys a virus card token",
            DestroyVirusToken,
        )
        .with_impact(1, 1)
        .impacting(&[VIRUS_ELEMENT_ID]),
        CardDefinition::new(
            "A4",
            Advantage,
            "Safe Ports",
            "Cannot get infected by neighbours",
            PreventFromNeighborInfection,
        ),
        CardDefinition::new(
            "D1",
            Disadvantage,
            "Social Ignorance",
            "Each round increments a token on a virus card",
            IncrementVirusToken,
        )
        .with_impact(1, 1)
        .impacting(&[VIRUS_ELEMENT_ID]),
        CardDefinition::new(
            "D2",
            Disadvantage,
            "Slums",
            "Each round increments two tokens on a virus card",
            IncrementVirusToken,
        )
        .with_impact(2, 1)
        .impacting(&[VIRUS_ELEMENT_ID]),
        CardDefinition::new(
            "D3",
            Disadvantage,
            "Fighting Narratives",
            "Each round increments a token on three virus cards",
            IncrementVirusToken,
        )
        .with_impact(1, 3)
        .impacting(&[VIRUS_ELEMENT_ID]),
        CardDefinition::new(
            "D4",
            Disadvantage,
            "Overloaded Hospitals",
            "Public Health System and Medics take no effect",
            PreventCardAction,
        )
        .with_impact(0, 1)
        .impacting(&["A2", "R4"]),
    ]
}

/// Every definition in the game, in catalog order.
pub fn catalog() -> &'static [CardDefinition] {
    &CATALOG
}

pub fn find_definition(element_id: &str) -> Option<&'static CardDefinition> {
    CATALOG
        .iter()
        .find(|definition| definition.element_id == element_id)
}

pub fn definitions_in(category: CardCategory) -> impl Iterator<Item = &'static CardDefinition> {
    CATALOG
        .iter()
        .filter(move |definition| definition.category == category)
}

pub fn virus_definition() -> &'static CardDefinition {
    // The virus definition is the first catalog entry.
    &CATALOG[0]
}
