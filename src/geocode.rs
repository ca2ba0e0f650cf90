// Static city -> coordinates table for the Pernambuco service area.
use crate::types::Coordinates;
use once_cell::sync::Lazy;
use std::collections::HashMap;

static CITY_COORDINATES: Lazy<HashMap<&'static str, Coordinates>> = Lazy::new(|| {
    [
        ("AFOGADOS DA INGAZEIRA", -7.7495, -37.6385),
        ("BELO JARDIM", -8.3323, -36.4255),
        ("BREJINHO", -7.3486, -37.2974),
        ("CARUARU", -8.2849, -35.9696),
        ("GARANHUNS", -8.8829, -36.4957),
        ("GOIANA", -7.5593, -35.0003),
        ("ITAMBE", -7.4087, -35.1099),
        ("JABOATAO", -8.1105, -35.0177),
        ("LAJEDO", -8.6625, -36.3197),
        ("LIMOEIRO", -7.8732, -35.4507),
        ("MACAPARANA", -7.5539, -35.4533),
        ("OLINDA", -8.0089, -34.8553),
        ("OROBO", -7.7342, -35.6033),
        ("PETROLANDIA", -8.9790, -38.2195),
        ("PETROLINA", -9.3831, -40.5069),
        ("POMBOS", -8.1388, -35.3976),
        ("RECIFE", -8.0476, -34.8770),
        ("SANTA CRUZ CAPIBARIBE", -7.9472, -36.2045),
        ("SAO JOSE DO EGITO", -7.4764, -37.2694),
        ("SAO LOURENCO DA MATA", -8.0016, -35.0176),
        ("SAO VICENTE FERRER", -7.5910, -35.4899),
        ("SERRA TALHADA", -7.9931, -38.2983),
        ("TABIRA", -7.5901, -37.5348),
        ("TIMBAUBA", -7.5028, -35.3202),
        ("VITORIA DE SANTO ANTAO", -8.1190, -35.2952),
    ]
    .into_iter()
    .map(|(city, lat, lon)| (city, Coordinates { lat, lon }))
    .collect()
});

/// Look a city up by its exact ledger spelling. Keys are uppercase, so a
/// differently cased name is unknown and stays off the map.
pub fn lookup(city: &str) -> Option<Coordinates> {
    CITY_COORDINATES.get(city).copied()
}
