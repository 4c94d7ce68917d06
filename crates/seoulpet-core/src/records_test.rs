use serde_json::json;

use super::*;

fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("fixture must be an object, got {other}"),
    }
}

#[test]
fn registration_decodes_and_computes_percentages() {
    let row = PetRegistration::from_record(&record(json!({
        "sido": "Seoul",
        "sigungu": "Gangnam",
        "dog_registration_total": 100,
        "cat_registration_total": 50,
        "total_registration": 150
    })))
    .expect("valid registration");

    assert_eq!(row.full_address(), "Seoul Gangnam");
    assert!((row.dog_percentage() - 66.67).abs() < f64::EPSILON);
    assert!((row.cat_percentage() - 33.33).abs() < f64::EPSILON);
    assert!(row.data_year.is_none());
}

#[test]
fn registration_accepts_string_counts_with_separators() {
    let row = PetRegistration::from_record(&record(json!({
        "sido": "Seoul",
        "sigungu": "",
        "dog_registration_total": "1,200",
        "cat_registration_total": " 300 ",
        "total_registration": "1500",
        "data_year": 2024,
        "data_month": "05"
    })))
    .expect("string counts should parse");

    assert_eq!(row.dog_registration_total, 1200);
    assert_eq!(row.cat_registration_total, 300);
    assert!(row.sigungu.is_none(), "blank sigungu becomes None");
    assert_eq!(row.full_address(), "Seoul");
    assert_eq!(row.data_year.as_deref(), Some("2024"));
}

#[test]
fn registration_with_zero_total_has_zero_percentages() {
    let row = PetRegistration {
        sido: "Seoul".to_string(),
        sigungu: None,
        dog_registration_total: 0,
        cat_registration_total: 0,
        total_registration: 0,
        data_year: None,
        data_month: None,
        update_date: None,
    };
    assert!(row.dog_percentage().abs() < f64::EPSILON);
    assert!(row.cat_percentage().abs() < f64::EPSILON);
}

#[test]
fn registration_rejects_negative_counts() {
    let err = PetRegistration::from_record(&record(json!({
        "sido": "Seoul",
        "dog_registration_total": -1,
        "cat_registration_total": 0,
        "total_registration": 0
    })))
    .unwrap_err();
    assert!(
        matches!(err, RecordError::Invalid { field: "dog_registration_total", .. }),
        "got: {err}"
    );
}

#[test]
fn registration_missing_required_field_is_shape_error() {
    let err = PetRegistration::from_record(&record(json!({
        "sigungu": "Mapo",
        "dog_registration_total": 1,
        "cat_registration_total": 1,
        "total_registration": 2
    })))
    .unwrap_err();
    assert!(matches!(err, RecordError::Shape { .. }), "got: {err}");
    assert!(err.to_string().contains("pet registration"));
}

#[test]
fn registration_rejects_blank_sido() {
    let err = PetRegistration::from_record(&record(json!({
        "sido": "  ",
        "dog_registration_total": 1,
        "cat_registration_total": 1,
        "total_registration": 2
    })))
    .unwrap_err();
    assert!(matches!(err, RecordError::Invalid { field: "sido", .. }));
}

#[test]
fn registration_rejects_non_numeric_count() {
    let err = PetRegistration::from_record(&record(json!({
        "sido": "Seoul",
        "dog_registration_total": "many",
        "cat_registration_total": 1,
        "total_registration": 2
    })))
    .unwrap_err();
    assert!(matches!(err, RecordError::Shape { .. }));
}

#[test]
fn clinic_parses_string_coordinates() {
    let clinic = PetClinic::from_record(&record(json!({
        "mgt_no": "3000000-101-2019-00001",
        "name": "Happy Paws Animal Hospital",
        "business_status": "영업/정상",
        "latitude": "37.4979",
        "longitude": "127.0276",
        "phone": ""
    })))
    .expect("valid clinic");

    assert_eq!(clinic.latitude, Some(37.4979));
    assert_eq!(clinic.longitude, Some(127.0276));
    assert!(clinic.phone.is_none());
}

#[test]
fn clinic_rejects_out_of_range_latitude() {
    let err = PetClinic::from_record(&record(json!({
        "mgt_no": "X-1",
        "name": "Clinic",
        "latitude": 137.0
    })))
    .unwrap_err();
    assert!(matches!(err, RecordError::Invalid { field: "latitude", .. }));
}

#[test]
fn clinic_requires_management_number() {
    let err = PetClinic::from_record(&record(json!({ "mgt_no": "", "name": "Clinic" }))).unwrap_err();
    assert!(matches!(err, RecordError::Invalid { field: "mgt_no", .. }));
}

#[test]
fn weather_accepts_numeric_timestamp_and_blank_readings() {
    let obs = WeatherObservation::from_record(&record(json!({
        "station_name": "Jongno",
        "observed_at": 2024_05_01_13_i64,
        "temperature": "18.5",
        "humidity": "",
        "precipitation": 0
    })))
    .expect("valid observation");

    assert_eq!(obs.observed_at, "2024050113");
    assert_eq!(obs.temperature, Some(18.5));
    assert!(obs.humidity.is_none());
    assert_eq!(obs.precipitation, Some(0.0));
}

#[test]
fn weather_rejects_humidity_over_100() {
    let err = WeatherObservation::from_record(&record(json!({
        "station_name": "Jongno",
        "observed_at": "2024-05-01 13:00",
        "humidity": 120
    })))
    .unwrap_err();
    assert!(matches!(err, RecordError::Invalid { field: "humidity", .. }));
}

#[test]
fn registration_percentages_helper_matches_row_methods() {
    let (dog, cat) = registration_percentages(100, 50, 150);
    assert!((dog - 66.67).abs() < f64::EPSILON);
    assert!((cat - 33.33).abs() < f64::EPSILON);
}
