//! Complaint draft construction, categories and the timestamp newtype
use super::error::ValidationError;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

/// Category tag for a new complaint. The well-known categories mirror the
/// grievance form; anything else travels as `Other` so the set stays open.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub enum Category {
    #[n(0)]
    MissingResults,
    #[n(1)]
    WrongScore,
    #[n(2)]
    IncompleteScore,
    #[n(3)]
    NotUploaded,
    #[n(4)]
    WrongGrade,
    #[n(5)]
    Other(#[n(0)] String),
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::MissingResults => f.write_str("Missing results"),
            Category::WrongScore => f.write_str("Wrong score"),
            Category::IncompleteScore => f.write_str("Incomplete score (CA or Exam)"),
            Category::NotUploaded => f.write_str("Not uploaded"),
            Category::WrongGrade => f.write_str("Wrong grade"),
            Category::Other(label) => f.write_str(label),
        }
    }
}

impl FromStr for Category {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Missing results" => Category::MissingResults,
            "Wrong score" => Category::WrongScore,
            "Incomplete score (CA or Exam)" => Category::IncompleteScore,
            "Not uploaded" => Category::NotUploaded,
            "Wrong grade" => Category::WrongGrade,
            other => Category::Other(other.to_string()),
        })
    }
}

// Also used for constructing drafts before submission
#[derive(Debug, Default)]
pub struct ComplaintDraft {
    course_code: Option<String>,
    course_title: Option<String>,
    lecturer_name: Option<String>,
    department: Option<String>,
    category: Option<Category>,
    description: Option<String>,
    evidence_file: Option<String>,
}

/// Validated complaint fields, immutable once the case is filed.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub struct ComplaintDetails {
    #[n(0)]
    pub course_code: String,
    #[n(1)]
    pub course_title: String,
    // Free text as written on the form, not a directory reference
    #[n(2)]
    pub lecturer_name: String,
    #[n(3)]
    pub department: String,
    #[n(4)]
    pub category: Category,
    #[n(5)]
    pub description: String,
    // Filename only, the file itself is never stored
    #[n(6)]
    pub evidence_file: String,
}

#[derive(Debug, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

// `DateTime<T>` is comparable and ordered by its instant for every time zone,
// but deriving `PartialEq`/`Eq`/`PartialOrd`/`Ord` would demand the same trait
// of `T` (which `Utc` does not implement for ordering). Hand-write the impls
// with the bound the field actually needs.
impl<T: TimeZone> PartialEq for TimeStamp<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<T: TimeZone> Eq for TimeStamp<T> {}
impl<T: TimeZone> PartialOrd for TimeStamp<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: TimeZone> Ord for TimeStamp<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl ComplaintDraft {
    /// Construct a new builder object, this becomes the basis for a draft
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_course_code(mut self, code: &str) -> Self {
        self.course_code = Some(code.to_string());
        self
    }
    pub fn set_course_title(mut self, title: &str) -> Self {
        self.course_title = Some(title.to_string());
        self
    }
    pub fn set_lecturer_name(mut self, name: &str) -> Self {
        self.lecturer_name = Some(name.to_string());
        self
    }
    pub fn set_department(mut self, department: &str) -> Self {
        self.department = Some(department.to_string());
        self
    }
    pub fn set_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
    pub fn set_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
    pub fn set_evidence_file(mut self, filename: &str) -> Self {
        self.evidence_file = Some(filename.to_string());
        self
    }

    /// Checks required fields and freezes the draft into [`ComplaintDetails`].
    /// Course code, lecturer name and description must be present and
    /// non-empty; everything else falls back to an empty value.
    pub fn finalise(self) -> Result<ComplaintDetails, ValidationError> {
        let course_code = self
            .course_code
            .filter(|s| !s.trim().is_empty())
            .ok_or(ValidationError::MissingField("course_code"))?;
        let lecturer_name = self
            .lecturer_name
            .filter(|s| !s.trim().is_empty())
            .ok_or(ValidationError::MissingField("lecturer_name"))?;
        let description = self
            .description
            .filter(|s| !s.trim().is_empty())
            .ok_or(ValidationError::MissingField("description"))?;

        Ok(ComplaintDetails {
            course_code,
            course_title: self.course_title.unwrap_or_default(),
            lecturer_name,
            department: self.department.unwrap_or_default(),
            category: self
                .category
                .unwrap_or(Category::Other(String::from("Unspecified"))),
            description,
            evidence_file: self.evidence_file.unwrap_or_default(),
        })
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}
impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}
impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn draft_finalises_with_required_fields() {
        let details = ComplaintDraft::new()
            .set_course_code("CSC401")
            .set_lecturer_name("Dr. Bello")
            .set_description("missing")
            .finalise()
            .unwrap();

        assert_eq!(details.course_code, "CSC401");
        assert_eq!(details.course_title, "");
        assert_eq!(details.evidence_file, "");
    }

    #[test]
    fn draft_rejects_missing_description() {
        let err = ComplaintDraft::new()
            .set_course_code("CSC401")
            .set_lecturer_name("Dr. Bello")
            .finalise()
            .unwrap_err();

        assert!(matches!(err, ValidationError::MissingField("description")));
    }

    #[test]
    fn blank_course_code_counts_as_missing() {
        let err = ComplaintDraft::new()
            .set_course_code("   ")
            .set_lecturer_name("Dr. Bello")
            .set_description("missing")
            .finalise()
            .unwrap_err();

        assert!(matches!(err, ValidationError::MissingField("course_code")));
    }

    #[test]
    fn category_labels_round_trip() {
        for label in [
            "Missing results",
            "Wrong score",
            "Incomplete score (CA or Exam)",
            "Not uploaded",
            "Wrong grade",
        ] {
            let parsed: Category = label.parse().unwrap();
            assert_eq!(parsed.to_string(), label);
        }

        let parsed: Category = "Lecturer dispute".parse().unwrap();
        assert_eq!(parsed, Category::Other("Lecturer dispute".to_string()));
    }
}
