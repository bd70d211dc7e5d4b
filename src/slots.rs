use crate::error::SlotError;
use crate::models::PromptEntry;
use uuid::Uuid;

pub const MIN_SLOTS: usize = 2;
pub const MAX_SLOTS: usize = 5;

/// Accent colors handed out to new slots, cycling by slot count
pub const PALETTE: [&str; 5] = [
    "hsl(189, 94%, 43%)",
    "hsl(280, 80%, 60%)",
    "hsl(25, 95%, 53%)",
    "hsl(142, 76%, 36%)",
    "hsl(330, 80%, 60%)",
];

/// One prompt as supplied from the command line or run file
#[derive(Debug, Clone, Default)]
pub struct SlotInput {
    pub name: Option<String>,
    pub value: String,
    pub color: Option<String>,
}

/// The comparison form: between 2 and 5 editable prompt entries
#[derive(Debug, Clone)]
pub struct PromptSlots {
    entries: Vec<PromptEntry>,
}

impl Default for PromptSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptSlots {
    /// Start with the minimum number of empty slots
    pub fn new() -> Self {
        let mut slots = Self {
            entries: Vec::with_capacity(MAX_SLOTS),
        };
        for _ in 0..MIN_SLOTS {
            slots.push_default();
        }
        slots
    }

    /// Fill slots from inputs in order, adding slots past the initial two as needed
    pub fn from_inputs(inputs: impl IntoIterator<Item = SlotInput>) -> Result<Self, SlotError> {
        let mut slots = Self::new();

        for (index, input) in inputs.into_iter().enumerate() {
            let existing = slots.entries.get(index).map(|entry| entry.id);
            let id = match existing {
                Some(id) => id,
                None => slots.add()?.id,
            };
            slots.set_value(id, input.value)?;
            if let Some(name) = input.name {
                slots.set_name(id, name)?;
            }
            if let Some(color) = input.color {
                slots.set_color(id, color)?;
            }
        }

        Ok(slots)
    }

    pub fn entries(&self) -> &[PromptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_add(&self) -> bool {
        self.entries.len() < MAX_SLOTS
    }

    pub fn can_remove(&self) -> bool {
        self.entries.len() > MIN_SLOTS
    }

    /// Entries with non-blank prompt text, in input order
    pub fn filled(&self) -> impl Iterator<Item = &PromptEntry> {
        self.entries.iter().filter(|entry| entry.is_filled())
    }

    pub fn add(&mut self) -> Result<&PromptEntry, SlotError> {
        if !self.can_add() {
            return Err(SlotError::Full { max: MAX_SLOTS });
        }
        Ok(self.push_default())
    }

    pub fn remove(&mut self, id: Uuid) -> Result<PromptEntry, SlotError> {
        let index = self.position(id)?;
        if !self.can_remove() {
            return Err(SlotError::AtMinimum { min: MIN_SLOTS });
        }
        Ok(self.entries.remove(index))
    }

    pub fn set_name(&mut self, id: Uuid, name: impl Into<String>) -> Result<(), SlotError> {
        self.entry_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn set_value(&mut self, id: Uuid, value: impl Into<String>) -> Result<(), SlotError> {
        self.entry_mut(id)?.value = value.into();
        Ok(())
    }

    pub fn set_color(&mut self, id: Uuid, color: impl Into<String>) -> Result<(), SlotError> {
        self.entry_mut(id)?.color = color.into();
        Ok(())
    }

    fn push_default(&mut self) -> &PromptEntry {
        let count = self.entries.len();
        self.entries.push(PromptEntry {
            id: Uuid::new_v4(),
            name: format!("Prompt {}", count + 1),
            value: String::new(),
            color: PALETTE[count % PALETTE.len()].to_string(),
        });
        &self.entries[count]
    }

    fn position(&self, id: Uuid) -> Result<usize, SlotError> {
        self.entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(SlotError::NotFound(id))
    }

    fn entry_mut(&mut self, id: Uuid) -> Result<&mut PromptEntry, SlotError> {
        let index = self.position(id)?;
        Ok(&mut self.entries[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(value: &str) -> SlotInput {
        SlotInput {
            value: value.to_string(),
            ..SlotInput::default()
        }
    }

    #[test]
    fn test_new_has_two_named_slots() {
        let slots = PromptSlots::new();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots.entries()[0].name, "Prompt 1");
        assert_eq!(slots.entries()[1].name, "Prompt 2");
        assert_eq!(slots.entries()[0].color, PALETTE[0]);
        assert_eq!(slots.entries()[1].color, PALETTE[1]);
        assert_ne!(slots.entries()[0].id, slots.entries()[1].id);
    }

    #[test]
    fn test_add_rejected_at_five() {
        let mut slots = PromptSlots::new();
        for expected in 3..=5 {
            let entry = slots.add().unwrap();
            assert_eq!(entry.name, format!("Prompt {}", expected));
        }
        assert_eq!(slots.entries()[4].color, PALETTE[4]);
        assert_eq!(slots.add().unwrap_err(), SlotError::Full { max: 5 });
        assert_eq!(slots.len(), 5);
    }

    #[test]
    fn test_remove_rejected_at_two() {
        let mut slots = PromptSlots::new();
        let first = slots.entries()[0].id;
        assert_eq!(slots.remove(first).unwrap_err(), SlotError::AtMinimum { min: 2 });
        assert_eq!(slots.len(), 2);

        let added = slots.add().unwrap().id;
        let removed = slots.remove(first).unwrap();
        assert_eq!(removed.id, first);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots.entries()[1].id, added);
    }

    #[test]
    fn test_unknown_id_is_reported() {
        let mut slots = PromptSlots::new();
        let stranger = Uuid::new_v4();
        assert_eq!(slots.set_name(stranger, "x"), Err(SlotError::NotFound(stranger)));
        assert_eq!(slots.remove(stranger).unwrap_err(), SlotError::NotFound(stranger));
    }

    #[test]
    fn test_edits_apply_in_place() {
        let mut slots = PromptSlots::new();
        let id = slots.entries()[1].id;
        slots.set_name(id, "Verbose").unwrap();
        slots.set_value(id, "Explain in detail").unwrap();
        slots.set_color(id, "hsl(0, 0%, 50%)").unwrap();

        let entry = &slots.entries()[1];
        assert_eq!(entry.id, id);
        assert_eq!(entry.name, "Verbose");
        assert_eq!(entry.value, "Explain in detail");
        assert_eq!(entry.color, "hsl(0, 0%, 50%)");
    }

    #[test]
    fn test_filled_skips_blank_entries() {
        let slots =
            PromptSlots::from_inputs(vec![input("First"), input("   "), input("Third")]).unwrap();
        let names: Vec<&str> = slots.filled().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Prompt 1", "Prompt 3"]);
    }

    #[test]
    fn test_from_inputs_applies_overrides() {
        let slots = PromptSlots::from_inputs(vec![
            SlotInput {
                name: Some("Terse".to_string()),
                value: "Summarize.".to_string(),
                color: Some("hsl(1, 2%, 3%)".to_string()),
            },
            input("Summarize in three bullet points."),
        ])
        .unwrap();

        assert_eq!(slots.entries()[0].name, "Terse");
        assert_eq!(slots.entries()[0].color, "hsl(1, 2%, 3%)");
        assert_eq!(slots.entries()[1].name, "Prompt 2");
    }

    #[test]
    fn test_from_inputs_keeps_minimum_and_caps_maximum() {
        let single = PromptSlots::from_inputs(vec![input("Only one")]).unwrap();
        assert_eq!(single.len(), 2);
        assert_eq!(single.filled().count(), 1);

        let too_many = PromptSlots::from_inputs((0..6).map(|i| input(&format!("p{}", i))));
        assert_eq!(too_many.unwrap_err(), SlotError::Full { max: 5 });
    }
}
