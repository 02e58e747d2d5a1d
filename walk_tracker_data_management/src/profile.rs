use walk_session::collaborators::ProfileProvider;

/// A profile fixed for the lifetime of the process, as selected on the command line.
#[derive(Debug, Clone)]
pub struct StaticProfile {
    subject_id: Option<String>,
    pet_id: Option<String>,
}

impl StaticProfile {
    /// Blank ids count as not selected.
    pub fn new(subject_id: Option<String>, pet_id: Option<String>) -> Self {
        Self {
            subject_id: subject_id.filter(|id| !id.trim().is_empty()),
            pet_id: pet_id.filter(|id| !id.trim().is_empty()),
        }
    }
}

impl ProfileProvider for StaticProfile {
    fn current_subject_id(&self) -> Option<String> {
        self.subject_id.clone()
    }

    fn current_pet_id(&self) -> Option<String> {
        self.pet_id.clone()
    }
}
