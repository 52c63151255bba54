//! Profile field handlers.

use chrono::Datelike;

use crate::engine::{HandlerContext, HandlerResult};
use crate::store::DataTyp;
use crate::types::Result;

use super::flags::*;
use super::MenuHandlers;

impl MenuHandlers {
    /// Store a free-text profile field.
    pub(crate) async fn save_field(
        &self,
        ctx: &HandlerContext,
        typ: DataTyp,
        input: &str,
    ) -> Result<HandlerResult> {
        let value = input.trim();
        if value.is_empty() {
            return Ok(HandlerResult::default());
        }
        self.user.set(&ctx.session_id, typ, value.as_bytes()).await?;
        Ok(HandlerResult::default().set(FLAG_UNLOCK_FOR_UPDATE))
    }

    /// Gender is selected by menu index.
    pub(crate) async fn save_gender(
        &self,
        ctx: &HandlerContext,
        input: &str,
    ) -> Result<HandlerResult> {
        let gender = match input.trim() {
            "1" => "male",
            "2" => "female",
            "3" => "other",
            _ => return Ok(HandlerResult::default()),
        };
        self.user
            .set(&ctx.session_id, DataTyp::Gender, gender.as_bytes())
            .await?;
        Ok(HandlerResult::default().set(FLAG_UNLOCK_FOR_UPDATE))
    }

    /// A year of birth must be a plausible four digit year.
    pub(crate) async fn verify_yob(
        &self,
        _ctx: &HandlerContext,
        input: &str,
    ) -> Result<HandlerResult> {
        let input = input.trim();
        let current_year = chrono::Utc::now().year();
        let valid = input.len() == 4
            && input
                .parse::<i32>()
                .is_ok_and(|y| (1900..=current_year).contains(&y));
        if valid {
            Ok(HandlerResult::default().reset(FLAG_INCORRECT_DATE_FORMAT))
        } else {
            Ok(HandlerResult::content(input).set(FLAG_INCORRECT_DATE_FORMAT))
        }
    }

    /// Store the year of birth once it verified.
    pub(crate) async fn save_yob(
        &self,
        ctx: &HandlerContext,
        input: &str,
    ) -> Result<HandlerResult> {
        if ctx.flags.get(FLAG_INCORRECT_DATE_FORMAT) {
            return Ok(HandlerResult::default());
        }
        self.user
            .set(&ctx.session_id, DataTyp::Yob, input.trim().as_bytes())
            .await?;
        Ok(HandlerResult::default())
    }

    /// Render the stored profile as display lines.
    pub(crate) async fn view_profile(&self, ctx: &HandlerContext) -> Result<HandlerResult> {
        let session = &ctx.session_id;
        let mut lines = Vec::new();
        for (label, typ) in [
            ("Name", DataTyp::FirstName),
            ("Family name", DataTyp::FamilyName),
            ("Gender", DataTyp::Gender),
            ("Year of birth", DataTyp::Yob),
            ("Location", DataTyp::Location),
            ("Offerings", DataTyp::Offerings),
        ] {
            let value = self
                .user
                .get_str(session, typ)
                .await?
                .unwrap_or_else(|| "Not set".to_string());
            lines.push(format!("{label}: {value}"));
        }
        Ok(HandlerResult::content(lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ctx, handlers};
    use super::*;
    use crate::engine::FlagSet;
    use crate::engine::HandlerContext;

    #[tokio::test]
    async fn test_save_field_round_trip() {
        let h = handlers();
        h.save_field(&ctx("s1"), DataTyp::FirstName, " Amina ")
            .await
            .unwrap();
        assert_eq!(
            h.user.get_str("s1", DataTyp::FirstName).await.unwrap(),
            Some("Amina".to_string())
        );
    }

    #[tokio::test]
    async fn test_save_gender_maps_index() {
        let h = handlers();
        h.save_gender(&ctx("s1"), "2").await.unwrap();
        assert_eq!(
            h.user.get_str("s1", DataTyp::Gender).await.unwrap(),
            Some("female".to_string())
        );
        let result = h.save_gender(&ctx("s1"), "9").await.unwrap();
        assert!(result.flag_set.is_empty());
    }

    #[tokio::test]
    async fn test_verify_yob() {
        let h = handlers();
        let ok = h.verify_yob(&ctx("s1"), "1985").await.unwrap();
        assert!(ok.flag_reset.contains(&FLAG_INCORRECT_DATE_FORMAT));

        for bad in ["85", "3025", "19x5", "1899"] {
            let result = h.verify_yob(&ctx("s1"), bad).await.unwrap();
            assert!(
                result.flag_set.contains(&FLAG_INCORRECT_DATE_FORMAT),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_save_yob_skips_when_format_flag_raised() {
        let h = handlers();
        let mut flags = FlagSet::new(32);
        flags.set(FLAG_INCORRECT_DATE_FORMAT);
        let bad_ctx = HandlerContext {
            session_id: "s1".to_string(),
            flags,
            language: None,
        };
        h.save_yob(&bad_ctx, "junk").await.unwrap();
        assert_eq!(h.user.get("s1", DataTyp::Yob).await.unwrap(), None);

        h.save_yob(&ctx("s1"), "1985").await.unwrap();
        assert_eq!(
            h.user.get_str("s1", DataTyp::Yob).await.unwrap(),
            Some("1985".to_string())
        );
    }

    #[tokio::test]
    async fn test_view_profile_lists_fields() {
        let h = handlers();
        h.save_field(&ctx("s1"), DataTyp::FirstName, "Amina").await.unwrap();
        let result = h.view_profile(&ctx("s1")).await.unwrap();
        assert!(result.content.contains("Name: Amina"));
        assert!(result.content.contains("Location: Not set"));
    }
}
