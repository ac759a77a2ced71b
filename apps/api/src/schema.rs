//! Repohero schema
//!
//! Repos grouped into categories, reviewed and liked by users. Mutation
//! results are unions of their success type and `ValidationError`.

use graph_engine::{FieldType, Schema, SchemaError};

/// Build the Repohero schema
pub fn build_schema() -> Result<Schema, SchemaError> {
    let list = |type_name: &str| FieldType::list_of(FieldType::object(type_name));

    Schema::builder()
        .object("Query", |t| {
            t.field_with_description(
                "testField",
                FieldType::string(),
                "Smoke-test field, always \"Hello World\"",
            )
            .field("repos", list("Repo"))
            .field("repo", FieldType::object("Repo").nullable())
            .field("categories", list("Category"))
            .field_with_description(
                "events",
                list("Event"),
                "Reviews and likes of one repo, reviews first",
            )
        })
        .object("Mutation", |t| {
            t.field("testField", FieldType::string())
                .field("signup", FieldType::object("SignupResult"))
                .field("login", FieldType::object("LoginResult"))
                .field("addReview", FieldType::object("ReviewResult"))
                .field("updateReview", FieldType::object("ReviewResult"))
                .field("deleteReview", FieldType::object("DeleteReviewResult"))
        })
        .object("Repo", |t| {
            t.field("id", FieldType::id())
                .field("name", FieldType::string())
                .field("url", FieldType::string())
                .field("nameReversed", FieldType::string())
                .field("categories", list("Category"))
                .field("reviews", FieldType::connection("Review"))
        })
        .object("Category", |t| {
            t.field("id", FieldType::id())
                .field("name", FieldType::string())
                .field("repos", list("Repo"))
        })
        .object("Review", |t| {
            t.field("id", FieldType::id())
                .field("rating", FieldType::int())
                .field("comment", FieldType::string())
                .field("user", FieldType::object("User"))
                .field("repo", FieldType::object("Repo"))
        })
        .object("Like", |t| {
            t.field("id", FieldType::id())
                .field("user", FieldType::object("User"))
                .field("repo", FieldType::object("Repo"))
        })
        .object("User", |t| {
            t.field("id", FieldType::id())
                .field("name", FieldType::string())
                .field("email", FieldType::string())
        })
        .object("AuthenticatedUser", |t| {
            t.field("email", FieldType::string())
                .field("token", FieldType::string())
        })
        .object("DeletedReview", |t| t.field("id", FieldType::id()))
        .union("Event", [("review", "Review"), ("like", "Like")])
        .result_union("SignupResult", "AuthenticatedUser")
        .result_union("LoginResult", "AuthenticatedUser")
        .result_union("ReviewResult", "Review")
        .result_union("DeleteReviewResult", "DeletedReview")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_engine::TypeKind;

    #[test]
    fn test_schema_builds() {
        let schema = build_schema().unwrap();
        assert!(schema.mutation_root().is_ok());
        assert_eq!(schema.describe("Event").unwrap().kind(), TypeKind::Union);
        assert!(schema.describe("ValidationError").is_ok());
        assert!(schema.describe("ReviewConnection").is_ok());
    }

    #[test]
    fn test_result_unions_cover_validation_error() {
        let schema = build_schema().unwrap();
        for name in ["SignupResult", "LoginResult", "ReviewResult", "DeleteReviewResult"] {
            assert!(schema.describe(name).unwrap().has_member("ValidationError"), "{}", name);
        }
    }
}
