mod common;

use anyhow::Result;
use chrono::NaiveDate;
use common::{Fleet, admin, employee, head, test_service};
use maktab::application::AppError;
use maktab::domain::{
    Action, Correspondence, CorrespondenceKind, CorrespondenceStatus, Employee, RecordFilter,
    Role, Settings, UserRequest, UserRequestStatus,
};
use maktab::io::Exporter;

fn letter(reference: &str, subject: &str) -> Correspondence {
    Correspondence {
        kind: CorrespondenceKind::CustomsLetter,
        reference_number: reference.into(),
        recipient: "Customs Directorate".into(),
        subject: subject.into(),
        body: "Please release the listed equipment.".into(),
        date: NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
        status: CorrespondenceStatus::Draft,
    }
}

fn user_request(requester: &str) -> UserRequest {
    UserRequest {
        requester: requester.into(),
        subject: "Printer toner".into(),
        details: "Second floor printer is empty".into(),
        status: UserRequestStatus::Open,
    }
}

#[tokio::test]
async fn test_correspondence_needs_manage_records() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service
        .create_record(&employee("Ali"), letter("C-1", "Equipment release"))
        .await;
    assert!(matches!(
        result,
        Err(AppError::Forbidden {
            role: Role::Employee,
            action: Action::ManageRecords
        })
    ));

    let doc = service
        .create_record(&head(), letter("C-1", "Equipment release"))
        .await?;
    let fetched = service
        .get_record::<Correspondence>(&employee("Ali"), doc.id)
        .await?;
    assert_eq!(fetched.data.reference_number, "C-1");
    Ok(())
}

#[tokio::test]
async fn test_update_merges_fields() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let doc = service
        .create_record(&admin(), letter("C-7", "Vehicle import"))
        .await?;

    let updated = service
        .update_record::<Correspondence>(
            &admin(),
            doc.id,
            serde_json::json!({"status": "issued", "subject": "Vehicle import permit"}),
        )
        .await?;

    assert_eq!(updated.data.status, CorrespondenceStatus::Issued);
    assert_eq!(updated.data.subject, "Vehicle import permit");
    assert_eq!(updated.data.recipient, "Customs Directorate");
    assert!(updated.updated_at >= doc.updated_at);

    let bad = service
        .update_record::<Correspondence>(&admin(), doc.id, serde_json::json!({"status": "lost"}))
        .await;
    assert!(matches!(bad, Err(AppError::InvalidInput(_))));
    Ok(())
}

#[tokio::test]
async fn test_list_filters_by_status_and_search() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let first = service
        .create_record(&admin(), letter("C-1", "Equipment release"))
        .await?;
    service
        .create_record(&admin(), letter("C-2", "Staff visas"))
        .await?;
    service
        .update_record::<Correspondence>(&admin(), first.id, serde_json::json!({"status": "issued"}))
        .await?;

    let issued = service
        .list_records::<Correspondence>(
            &admin(),
            &RecordFilter {
                status: Some("ISSUED".into()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(issued.len(), 1);
    assert_eq!(issued[0].id, first.id);

    let visas = service
        .list_records::<Correspondence>(
            &admin(),
            &RecordFilter {
                search: Some("visa".into()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(visas.len(), 1);
    assert_eq!(visas[0].data.reference_number, "C-2");
    Ok(())
}

#[tokio::test]
async fn test_user_requests_are_self_service() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let doc = service
        .create_record(&employee("Sara"), user_request("Sara"))
        .await?;

    // Filing in someone else's name is not self-service
    let result = service
        .create_record(&employee("Sara"), user_request("Omar"))
        .await;
    assert!(matches!(result, Err(AppError::Forbidden { .. })));

    let result = service
        .update_record::<UserRequest>(
            &employee("Sara"),
            doc.id,
            serde_json::json!({"status": "resolved"}),
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden { .. })));

    let result = service
        .get_record::<UserRequest>(&employee("Omar"), doc.id)
        .await;
    assert!(matches!(
        result,
        Err(AppError::Forbidden {
            action: Action::ViewAllRecords,
            ..
        })
    ));

    let resolved = service
        .update_record::<UserRequest>(
            &admin(),
            doc.id,
            serde_json::json!({"status": "resolved"}),
        )
        .await?;
    assert_eq!(resolved.data.status, UserRequestStatus::Resolved);
    Ok(())
}

#[tokio::test]
async fn test_delete_record() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let doc = service
        .create_record(&employee("Sara"), user_request("Sara"))
        .await?;

    service
        .delete_record::<UserRequest>(&employee("Sara"), doc.id)
        .await?;

    let result = service
        .get_record::<UserRequest>(&admin(), doc.id)
        .await;
    assert!(matches!(
        result,
        Err(AppError::RecordNotFound {
            kind: "user_request",
            ..
        })
    ));

    let result = service
        .delete_record::<UserRequest>(&admin(), doc.id)
        .await;
    assert!(matches!(result, Err(AppError::RecordNotFound { .. })));
    Ok(())
}

#[tokio::test]
async fn test_staff_directory_needs_manage_staff() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let huda = Employee {
        name: "Huda".into(),
        job_title: "Head of Administration".into(),
        department: "Administration".into(),
        role: Role::HeadOfDepartment,
        phone: None,
        email: Some("huda@example.org".into()),
        hired_at: NaiveDate::from_ymd_opt(2019, 9, 1),
    };

    let result = service.create_record(&head(), huda.clone()).await;
    assert!(matches!(
        result,
        Err(AppError::Forbidden {
            action: Action::ManageStaff,
            ..
        })
    ));

    service.create_record(&admin(), huda).await?;
    let heads = service
        .list_records::<Employee>(
            &employee("Ali"),
            &RecordFilter {
                status: Some("head_of_department".into()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(heads.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_settings_default_and_save() -> Result<()> {
    let (service, _temp) = test_service().await?;
    assert_eq!(service.get_settings().await?, Settings::default());

    let settings = Settings {
        office_name: "Regional Office".into(),
        ..Default::default()
    };
    let result = service.save_settings(&head(), settings.clone()).await;
    assert!(matches!(result, Err(AppError::Forbidden { .. })));

    service.save_settings(&admin(), settings).await?;
    let mut changed = service.get_settings().await?;
    assert_eq!(changed.office_name, "Regional Office");

    changed.manager_name = "Director".into();
    service.save_settings(&admin(), changed).await?;
    let saved = service.get_settings().await?;
    assert_eq!(saved.office_name, "Regional Office");
    assert_eq!(saved.manager_name, "Director");
    Ok(())
}

#[tokio::test]
async fn test_full_export_respects_visibility() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let vehicle = Fleet::vehicle(&service, "X-1").await?;
    Fleet::checkout(&service, &vehicle, "Ali", "2024-01-02").await?;
    service
        .create_record(&employee("Sara"), user_request("Sara"))
        .await?;
    service
        .create_record(&employee("Omar"), user_request("Omar"))
        .await?;

    let actor = employee("Sara");
    let mut buffer = Vec::new();
    let snapshot = Exporter::new(&service, &actor)
        .export_full_json(&mut buffer)
        .await?;

    assert_eq!(snapshot.vehicles.len(), 1);
    assert_eq!(snapshot.permits.len(), 1);
    assert_eq!(snapshot.user_requests.len(), 1);

    let actor = admin();
    let snapshot = Exporter::new(&service, &actor)
        .export_full_json(std::io::sink())
        .await?;
    assert_eq!(snapshot.user_requests.len(), 2);

    let parsed: serde_json::Value = serde_json::from_slice(&buffer)?;
    assert_eq!(parsed["vehicles"][0]["plate_number"], "X-1");
    Ok(())
}

#[tokio::test]
async fn test_resolved_requests_belong_to_the_administration() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let mut resolved = user_request("Sara");
    resolved.status = UserRequestStatus::Resolved;
    let result = service.create_record(&employee("Sara"), resolved).await;
    assert!(matches!(
        result,
        Err(AppError::Forbidden {
            action: Action::ManageRecords,
            ..
        })
    ));

    let doc = service
        .create_record(&employee("Sara"), user_request("Sara"))
        .await?;
    service
        .update_record::<UserRequest>(&head(), doc.id, serde_json::json!({"status": "declined"}))
        .await?;

    let result = service
        .update_record::<UserRequest>(
            &employee("Sara"),
            doc.id,
            serde_json::json!({"details": "Still empty"}),
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden { .. })));

    let stored = service.get_record::<UserRequest>(&employee("Sara"), doc.id).await?;
    assert_eq!(stored.data.status, UserRequestStatus::Declined);
    assert_eq!(stored.data.details, "Second floor printer is empty");
    Ok(())
}
