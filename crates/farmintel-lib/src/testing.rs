//! Shared fixtures for unit tests

/// Two well separated crops, ten samples each
pub(crate) fn crop_csv() -> String {
    let mut csv = String::from("N,P,K,temperature,humidity,ph,rainfall,label\n");
    for i in 0..10 {
        let d = i as f64 * 0.5;
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},rice\n",
            90.0 + d,
            42.0 + d,
            43.0 - d,
            20.8 + d / 10.0,
            82.0 + d / 5.0,
            6.5,
            202.9 + d
        ));
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},chickpea\n",
            40.0 + d,
            67.0 - d,
            80.0 + d,
            18.0 + d / 10.0,
            16.0 + d / 5.0,
            7.2,
            80.0 - d
        ));
    }
    csv
}
