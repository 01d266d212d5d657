//! Score tags: one per kind of successful, scored request.

/// Kind of successful request counted on the score table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScoreTag {
    AddCourse,
    AddClass,
    SubmitAssignment,
    RegisterScores,
    GetAnnouncementList,
    GetAnnouncementDetail,
    GetGrades,
    SearchCourses,
    RegisterCourses,
}

/// How a tag's count turns into points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coefficient {
    /// `n` points per occurrence.
    Mag(i64),
    /// One point per `n` occurrences.
    Fraction(i64),
    /// Counted for reporting only.
    Unscored,
}

impl ScoreTag {
    pub const ALL: [ScoreTag; 9] = [
        ScoreTag::AddCourse,
        ScoreTag::AddClass,
        ScoreTag::SubmitAssignment,
        ScoreTag::RegisterScores,
        ScoreTag::GetAnnouncementList,
        ScoreTag::GetAnnouncementDetail,
        ScoreTag::GetGrades,
        ScoreTag::SearchCourses,
        ScoreTag::RegisterCourses,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreTag::AddCourse => "add course",
            ScoreTag::AddClass => "add class",
            ScoreTag::SubmitAssignment => "submit assignment",
            ScoreTag::RegisterScores => "register score",
            ScoreTag::GetAnnouncementList => "get announcements",
            ScoreTag::GetAnnouncementDetail => "get announcement detail",
            ScoreTag::GetGrades => "get grades",
            ScoreTag::SearchCourses => "search courses",
            ScoreTag::RegisterCourses => "register courses",
        }
    }

    pub fn coefficient(self) -> Coefficient {
        match self {
            ScoreTag::RegisterCourses => Coefficient::Mag(10),
            ScoreTag::SubmitAssignment => Coefficient::Mag(5),
            ScoreTag::GetGrades | ScoreTag::GetAnnouncementList => Coefficient::Fraction(10),
            _ => Coefficient::Unscored,
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for ScoreTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
