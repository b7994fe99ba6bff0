//! Symptom pattern table for rule-based drafting.
//!
//! Group order matters: matched groups contribute medications in table order,
//! and the keyword buckets are tried top to bottom.

use crate::models::MedicationEntry;

/// A literal medication line in the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MedicationTemplate {
    pub name: &'static str,
    pub strength: &'static str,
    pub frequency: &'static str,
    pub duration: &'static str,
    pub instructions: &'static str,
}

impl MedicationTemplate {
    pub fn to_entry(&self) -> MedicationEntry {
        MedicationEntry::new(
            self.name,
            self.strength,
            self.frequency,
            self.duration,
            self.instructions,
        )
    }
}

/// Trigger phrases mapped to up to two medications.
#[derive(Debug, Clone, Copy)]
pub struct PatternGroup {
    /// Clinical domain, for logs and docs
    pub domain: &'static str,
    /// Lowercase trigger phrases; the first one names the group
    pub triggers: &'static [&'static str],
    pub medications: &'static [MedicationTemplate],
}

impl PatternGroup {
    /// The phrase used to name this group in reasoning and notes.
    pub fn label(&self) -> &'static str {
        self.triggers[0]
    }
}

/// Secondary classification used when no pattern group matched.
#[derive(Debug, Clone, Copy)]
pub struct KeywordBucket {
    pub keywords: &'static [&'static str],
    pub medication: MedicationTemplate,
}

pub const PATTERN_GROUPS: &[PatternGroup] = &[
    PatternGroup {
        domain: "respiratory",
        triggers: &["cough", "dry cough", "chest congestion", "wet cough", "bronchitis", "wheezing"],
        medications: &[
            MedicationTemplate {
                name: "Dextromethorphan",
                strength: "15mg",
                frequency: "Every 6-8 hours",
                duration: "7 days",
                instructions: "Take with water. Do not exceed 120mg in 24 hours",
            },
            MedicationTemplate {
                name: "Guaifenesin",
                strength: "400mg",
                frequency: "Every 4 hours",
                duration: "7 days",
                instructions: "Take with a full glass of water",
            },
        ],
    },
    PatternGroup {
        domain: "cold and flu",
        triggers: &["cold", "flu", "runny nose", "nasal congestion", "stuffy nose", "sneezing", "influenza"],
        medications: &[
            MedicationTemplate {
                name: "Pseudoephedrine",
                strength: "30mg",
                frequency: "Every 4-6 hours",
                duration: "5 days",
                instructions: "Avoid taking close to bedtime",
            },
            MedicationTemplate {
                name: "Loratadine",
                strength: "10mg",
                frequency: "Once daily",
                duration: "7 days",
                instructions: "Take at the same time each day",
            },
        ],
    },
    PatternGroup {
        domain: "fever and general pain",
        triggers: &["fever", "high temperature", "body ache", "chills", "general pain", "muscle ache"],
        medications: &[
            MedicationTemplate {
                name: "Acetaminophen",
                strength: "500mg",
                frequency: "Every 6 hours as needed",
                duration: "3-5 days",
                instructions: "Do not exceed 4000mg in 24 hours",
            },
            MedicationTemplate {
                name: "Ibuprofen",
                strength: "400mg",
                frequency: "Every 6-8 hours as needed",
                duration: "3-5 days",
                instructions: "Take with food to avoid stomach upset",
            },
        ],
    },
    PatternGroup {
        domain: "headache and migraine",
        triggers: &["headache", "migraine", "head pain", "tension headache"],
        medications: &[
            MedicationTemplate {
                name: "Naproxen",
                strength: "250mg",
                frequency: "Every 12 hours",
                duration: "3 days",
                instructions: "Take with food or milk",
            },
            MedicationTemplate {
                name: "Sumatriptan",
                strength: "50mg",
                frequency: "At migraine onset, may repeat after 2 hours",
                duration: "As needed",
                instructions: "Do not exceed 200mg in 24 hours",
            },
        ],
    },
    PatternGroup {
        domain: "gastrointestinal",
        triggers: &["nausea", "vomiting", "stomach pain", "acid reflux", "indigestion", "upset stomach", "diarrhea"],
        medications: &[
            MedicationTemplate {
                name: "Ondansetron",
                strength: "4mg",
                frequency: "Every 8 hours as needed",
                duration: "3 days",
                instructions: "Dissolve on tongue if using orally disintegrating tablet",
            },
            MedicationTemplate {
                name: "Omeprazole",
                strength: "20mg",
                frequency: "Once daily before breakfast",
                duration: "14 days",
                instructions: "Swallow whole, do not crush",
            },
        ],
    },
    PatternGroup {
        domain: "allergic reaction",
        triggers: &["allergy", "allergic reaction", "rash", "itching", "hives", "seasonal allergies"],
        medications: &[
            MedicationTemplate {
                name: "Cetirizine",
                strength: "10mg",
                frequency: "Once daily",
                duration: "7 days",
                instructions: "May cause drowsiness",
            },
            MedicationTemplate {
                name: "Hydrocortisone Cream",
                strength: "1%",
                frequency: "Twice daily",
                duration: "7 days",
                instructions: "Apply a thin layer to the affected area",
            },
        ],
    },
    PatternGroup {
        domain: "bacterial infection",
        triggers: &["infection", "bacterial infection", "strep throat", "sinus infection", "ear infection", "urinary tract infection"],
        medications: &[
            MedicationTemplate {
                name: "Amoxicillin",
                strength: "500mg",
                frequency: "Every 8 hours",
                duration: "10 days",
                instructions: "Complete the full course even if symptoms improve",
            },
            MedicationTemplate {
                name: "Azithromycin",
                strength: "250mg",
                frequency: "Once daily",
                duration: "5 days",
                instructions: "Take 500mg on day 1, then 250mg daily",
            },
        ],
    },
    PatternGroup {
        domain: "anxiety and stress",
        triggers: &["anxiety", "stress", "panic", "nervousness", "worry"],
        medications: &[
            MedicationTemplate {
                name: "Hydroxyzine",
                strength: "25mg",
                frequency: "Every 6-8 hours as needed",
                duration: "14 days",
                instructions: "May cause drowsiness. Avoid alcohol",
            },
            MedicationTemplate {
                name: "Buspirone",
                strength: "5mg",
                frequency: "Twice daily",
                duration: "30 days",
                instructions: "Take consistently with or without food",
            },
        ],
    },
    PatternGroup {
        domain: "sleep disturbance",
        triggers: &["insomnia", "sleep problems", "trouble sleeping", "can't sleep", "sleeplessness"],
        medications: &[
            MedicationTemplate {
                name: "Melatonin",
                strength: "3mg",
                frequency: "Once at bedtime",
                duration: "14 days",
                instructions: "Take 30 minutes before bedtime",
            },
            MedicationTemplate {
                name: "Diphenhydramine",
                strength: "25mg",
                frequency: "At bedtime as needed",
                duration: "7 days",
                instructions: "Do not drive after taking. Short-term use only",
            },
        ],
    },
];

/// Tried in order; first bucket with a keyword in the symptom text wins.
pub const KEYWORD_BUCKETS: &[KeywordBucket] = &[
    KeywordBucket {
        keywords: &["pain", "ache", "sore"],
        medication: MedicationTemplate {
            name: "Ibuprofen",
            strength: "400mg",
            frequency: "Every 6-8 hours as needed",
            duration: "5 days",
            instructions: "Take with food for pain relief",
        },
    },
    KeywordBucket {
        keywords: &["tired", "fatigue", "weak"],
        medication: MedicationTemplate {
            name: "Multivitamin",
            strength: "1 tablet",
            frequency: "Once daily",
            duration: "30 days",
            instructions: "Take with breakfast",
        },
    },
];

/// Used when no bucket matches either.
pub const GENERAL_RELIEF: MedicationTemplate = MedicationTemplate {
    name: "Acetaminophen",
    strength: "500mg",
    frequency: "Every 6 hours as needed",
    duration: "3 days",
    instructions: "For general symptomatic relief. Do not exceed 4000mg in 24 hours",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shape() {
        assert_eq!(PATTERN_GROUPS.len(), 9);
        for group in PATTERN_GROUPS {
            assert!(!group.triggers.is_empty(), "{} has no triggers", group.domain);
            assert!(group.medications.len() <= 2, "{} has too many meds", group.domain);
            for trigger in group.triggers {
                assert_eq!(*trigger, trigger.to_lowercase());
            }
        }
    }

    #[test]
    fn test_table_order() {
        let domains: Vec<&str> = PATTERN_GROUPS.iter().map(|g| g.domain).collect();
        assert_eq!(
            domains,
            vec![
                "respiratory",
                "cold and flu",
                "fever and general pain",
                "headache and migraine",
                "gastrointestinal",
                "allergic reaction",
                "bacterial infection",
                "anxiety and stress",
                "sleep disturbance",
            ]
        );
    }

    #[test]
    fn test_labels_are_first_trigger() {
        assert_eq!(PATTERN_GROUPS[0].label(), "cough");
        assert_eq!(PATTERN_GROUPS[3].label(), "headache");
    }

    #[test]
    fn test_template_to_entry() {
        let entry = GENERAL_RELIEF.to_entry();
        assert_eq!(entry.name, "Acetaminophen");
        assert_eq!(entry.strength, "500mg");
        assert!(entry
            .instructions
            .as_deref()
            .unwrap_or_default()
            .contains("general symptomatic relief"));
    }
}
