use std::fmt;

/// Navigation entries, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Page {
    #[default]
    Home,
    DoctorChat,
    SymptomChecker,
    NutritionPlanner,
    HealthProgress,
    MentalHealthSupport,
    FindDoctor,
    About,
}

impl Page {
    pub const ALL: [Page; 8] = [
        Page::Home,
        Page::DoctorChat,
        Page::SymptomChecker,
        Page::NutritionPlanner,
        Page::HealthProgress,
        Page::MentalHealthSupport,
        Page::FindDoctor,
        Page::About,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::DoctorChat => "Doctor Chat",
            Page::SymptomChecker => "Symptom Checker",
            Page::NutritionPlanner => "Nutrition Planner",
            Page::HealthProgress => "Health Progress",
            Page::MentalHealthSupport => "Mental Health Support",
            Page::FindDoctor => "Find Doctor",
            Page::About => "About",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Page::Home => "/",
            Page::DoctorChat => "/chat",
            Page::SymptomChecker => "/symptoms",
            Page::NutritionPlanner => "/nutrition",
            Page::HealthProgress => "/progress",
            Page::MentalHealthSupport => "/mental-health",
            Page::FindDoctor => "/doctors",
            Page::About => "/about",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Page::Home => "🏠",
            Page::DoctorChat => "💬",
            Page::SymptomChecker => "🔍",
            Page::NutritionPlanner => "🥗",
            Page::HealthProgress => "📊",
            Page::MentalHealthSupport => "🧠",
            Page::FindDoctor => "👩‍⚕️",
            Page::About => "📘",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Home => "👨‍⚕️ AI HealthMate",
            Page::DoctorChat => "💬 Talk to the AI Doctor",
            Page::SymptomChecker => "🔍 Symptom Checker",
            Page::NutritionPlanner => "🥗 Nutrition Planner",
            Page::HealthProgress => "📊 Health Progress Tracker",
            Page::MentalHealthSupport => "🧠 Mental Health Support",
            Page::FindDoctor => "👩‍⚕️ Find a Doctor Near You",
            Page::About => "📘 About Us",
        }
    }

    pub fn from_label(label: &str) -> Option<Page> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|page| page.label().eq_ignore_ascii_case(label))
    }

    /// Menu selection; anything unrecognised lands on the default entry.
    pub fn select(label: Option<&str>) -> Page {
        label.and_then(Page::from_label).unwrap_or_default()
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
