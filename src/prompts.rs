//! Prompt construction for each page, plus the static content that never
//! reaches the model.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const TIP_OF_THE_DAY_PROMPT: &str = "Give one unique health tip for today.";
pub const TIP_OF_THE_DAY_ROLE: &str = "You are a health and wellness expert.";
pub const WORD_OF_THE_DAY_PROMPT: &str =
    "Give a health-related word of the day with meaning and usage example.";
pub const WORD_OF_THE_DAY_ROLE: &str = "You're a health vocabulary expert.";
pub const DOCTOR_CHAT_ROLE: &str = "You are an AI doctor providing helpful advice.";
pub const SYMPTOM_CHECKER_ROLE: &str = "You are an AI symptom checker.";
pub const NUTRITIONIST_ROLE: &str =
    "You are a nutritionist generating healthy and personalized meal plans.";
pub const MENTAL_HEALTH_ROLE: &str = "You are a mental health AI assistant.";

pub const DAILY_TIPS: [&str; 3] = [
    "🥗 Eat colorful fruits and vegetables every day.",
    "🏃‍♂️ Stay active — at least 30 minutes of exercise daily.",
    "💧 Drink 2-3 liters of water daily to stay hydrated.",
];

/// A prompt ready for the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePrompt {
    pub prompt: String,
    pub system_role: &'static str,
}

impl PagePrompt {
    fn new(prompt: String, system_role: &'static str) -> Self {
        Self {
            prompt,
            system_role,
        }
    }
}

/// Required form input was blank; the page warns instead of calling the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingInput {
    pub warning: &'static str,
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.warning)
    }
}

impl std::error::Error for MissingInput {}

fn required<'a>(input: &'a str, warning: &'static str) -> Result<&'a str, MissingInput> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Err(MissingInput { warning })
    } else {
        Ok(trimmed)
    }
}

fn optional(input: Option<&str>) -> Option<&str> {
    input.map(str::trim).filter(|value| !value.is_empty())
}

pub fn tip_of_the_day() -> PagePrompt {
    PagePrompt::new(TIP_OF_THE_DAY_PROMPT.to_string(), TIP_OF_THE_DAY_ROLE)
}

pub fn word_of_the_day() -> PagePrompt {
    PagePrompt::new(WORD_OF_THE_DAY_PROMPT.to_string(), WORD_OF_THE_DAY_ROLE)
}

pub fn doctor_chat(message: &str) -> Result<PagePrompt, MissingInput> {
    let message = required(message, "Please describe your symptoms.")?;
    Ok(PagePrompt::new(message.to_string(), DOCTOR_CHAT_ROLE))
}

pub fn symptom_check(symptoms: &str) -> Result<PagePrompt, MissingInput> {
    let symptoms = required(symptoms, "Please enter your symptoms to analyze.")?;
    Ok(PagePrompt::new(
        format!("Analyze the following symptoms: {symptoms}"),
        SYMPTOM_CHECKER_ROLE,
    ))
}

pub fn mental_health(feeling: &str) -> Result<PagePrompt, MissingInput> {
    let feeling = required(feeling, "Please describe your feelings.")?;
    Ok(PagePrompt::new(
        format!("Provide mental health advice for the following: {feeling}"),
        MENTAL_HEALTH_ROLE,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NutritionGoal {
    #[default]
    #[serde(rename = "Weight Loss")]
    WeightLoss,
    #[serde(rename = "Muscle Gain")]
    MuscleGain,
    #[serde(rename = "Balanced Diet")]
    BalancedDiet,
    #[serde(rename = "Diabetes-Friendly")]
    DiabetesFriendly,
    #[serde(rename = "Heart Health")]
    HeartHealth,
}

impl NutritionGoal {
    pub const ALL: [NutritionGoal; 5] = [
        NutritionGoal::WeightLoss,
        NutritionGoal::MuscleGain,
        NutritionGoal::BalancedDiet,
        NutritionGoal::DiabetesFriendly,
        NutritionGoal::HeartHealth,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            NutritionGoal::WeightLoss => "Weight Loss",
            NutritionGoal::MuscleGain => "Muscle Gain",
            NutritionGoal::BalancedDiet => "Balanced Diet",
            NutritionGoal::DiabetesFriendly => "Diabetes-Friendly",
            NutritionGoal::HeartHealth => "Heart Health",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|goal| goal.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for NutritionGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DietaryPreference {
    #[default]
    Vegetarian,
    Vegan,
    #[serde(rename = "Non-Vegetarian")]
    NonVegetarian,
    Pescatarian,
    #[serde(rename = "No Preference")]
    NoPreference,
}

impl DietaryPreference {
    pub const ALL: [DietaryPreference; 5] = [
        DietaryPreference::Vegetarian,
        DietaryPreference::Vegan,
        DietaryPreference::NonVegetarian,
        DietaryPreference::Pescatarian,
        DietaryPreference::NoPreference,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DietaryPreference::Vegetarian => "Vegetarian",
            DietaryPreference::Vegan => "Vegan",
            DietaryPreference::NonVegetarian => "Non-Vegetarian",
            DietaryPreference::Pescatarian => "Pescatarian",
            DietaryPreference::NoPreference => "No Preference",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|pref| pref.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for DietaryPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MealPlanRequest {
    pub goal: NutritionGoal,
    pub preference: DietaryPreference,
    pub allergies: Option<String>,
    pub additional_info: Option<String>,
}

pub fn meal_plan(request: &MealPlanRequest) -> PagePrompt {
    let mut prompt = format!(
        "Create a {} meal plan that is {}.",
        request.goal.label().to_lowercase(),
        request.preference.label().to_lowercase()
    );
    if let Some(allergies) = optional(request.allergies.as_deref()) {
        prompt.push_str(&format!(" Avoid {allergies}."));
    }
    if let Some(info) = optional(request.additional_info.as_deref()) {
        prompt.push_str(&format!(" Consider the following condition: {info}."));
    }
    PagePrompt::new(prompt, NUTRITIONIST_ROLE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Doctor {
    pub name: &'static str,
    pub specialty: &'static str,
    pub contact: &'static str,
}

pub const DOCTORS: [Doctor; 5] = [
    Doctor {
        name: "Dr. Neha Sharma",
        specialty: "Cardiologist",
        contact: "9876543210",
    },
    Doctor {
        name: "Dr. Anil Verma",
        specialty: "General Physician",
        contact: "9123456780",
    },
    Doctor {
        name: "Dr. Fatima Khan",
        specialty: "Dermatologist",
        contact: "9988776655",
    },
    Doctor {
        name: "Dr. Premal Pancholi",
        specialty: "Multispecialist",
        contact: "9876543210",
    },
    Doctor {
        name: "Dr. Nikesh Shah",
        specialty: "Orthopaedic",
        contact: "9823456702",
    },
];

/// Directory lookup. The location is only echoed back; the list is fixed.
pub fn doctors_near(location: &str) -> Result<(&str, &'static [Doctor]), MissingInput> {
    let location = required(location, "Please enter your location.")?;
    Ok((location, &DOCTORS))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TeamMember {
    pub name: &'static str,
    pub role: &'static str,
    pub image: &'static str,
    pub linkedin: &'static str,
    pub github: &'static str,
}

pub const ABOUT_BLURB: &str = "We are a team passionate about using AI to enhance healthcare.";

pub const TEAM: [TeamMember; 2] = [
    TeamMember {
        name: "Dr. Alice",
        role: "AI Healthcare Specialist",
        image: "https://i.imgur.com/0XhF2KT.png",
        linkedin: "https://linkedin.com",
        github: "https://github.com",
    },
    TeamMember {
        name: "John Doe",
        role: "Frontend Developer",
        image: "https://i.imgur.com/QoE7TnN.png",
        linkedin: "https://linkedin.com",
        github: "https://github.com",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_inputs_are_rejected() {
        for input in ["", "   ", "\n\t"] {
            assert_eq!(
                symptom_check(input).unwrap_err().warning,
                "Please enter your symptoms to analyze."
            );
            assert_eq!(
                mental_health(input).unwrap_err().warning,
                "Please describe your feelings."
            );
            assert!(doctor_chat(input).is_err());
            assert!(doctors_near(input).is_err());
        }
    }

    #[test]
    fn symptom_prompt_wraps_input() {
        let prompt = symptom_check("  headache and fever ").unwrap();
        assert_eq!(
            prompt.prompt,
            "Analyze the following symptoms: headache and fever"
        );
        assert_eq!(prompt.system_role, SYMPTOM_CHECKER_ROLE);
    }

    #[test]
    fn chat_prompt_is_verbatim() {
        let prompt = doctor_chat("I have a sore throat").unwrap();
        assert_eq!(prompt.prompt, "I have a sore throat");
        assert_eq!(prompt.system_role, DOCTOR_CHAT_ROLE);
    }

    #[test]
    fn meal_plan_minimal() {
        let prompt = meal_plan(&MealPlanRequest {
            goal: NutritionGoal::DiabetesFriendly,
            preference: DietaryPreference::NoPreference,
            ..MealPlanRequest::default()
        });
        assert_eq!(
            prompt.prompt,
            "Create a diabetes-friendly meal plan that is no preference."
        );
        assert_eq!(prompt.system_role, NUTRITIONIST_ROLE);
    }

    #[test]
    fn meal_plan_appends_optional_clauses_in_order() {
        let prompt = meal_plan(&MealPlanRequest {
            goal: NutritionGoal::MuscleGain,
            preference: DietaryPreference::Pescatarian,
            allergies: Some("peanuts".into()),
            additional_info: Some("high blood pressure".into()),
        });
        assert_eq!(
            prompt.prompt,
            "Create a muscle gain meal plan that is pescatarian. Avoid peanuts. \
             Consider the following condition: high blood pressure."
        );
    }

    #[test]
    fn meal_plan_skips_blank_optionals() {
        let prompt = meal_plan(&MealPlanRequest {
            allergies: Some("  ".into()),
            additional_info: Some(String::new()),
            ..MealPlanRequest::default()
        });
        assert_eq!(
            prompt.prompt,
            "Create a weight loss meal plan that is vegetarian."
        );
    }

    #[test]
    fn labels_round_trip_through_serde() {
        let goal: NutritionGoal = serde_json::from_str("\"Heart Health\"").unwrap();
        assert_eq!(goal, NutritionGoal::HeartHealth);
        let pref: DietaryPreference = serde_json::from_str("\"Non-Vegetarian\"").unwrap();
        assert_eq!(pref, DietaryPreference::NonVegetarian);
        assert_eq!(
            NutritionGoal::from_label("balanced diet"),
            Some(NutritionGoal::BalancedDiet)
        );
        assert_eq!(DietaryPreference::from_label("keto"), None);
    }

    #[test]
    fn doctor_list_ignores_location() {
        let (_, near_mumbai) = doctors_near("Mumbai").unwrap();
        let (_, near_zip) = doctors_near("94110").unwrap();
        assert_eq!(near_mumbai, near_zip);
        assert_eq!(near_mumbai.len(), 5);
    }
}
