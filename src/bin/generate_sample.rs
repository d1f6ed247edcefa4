use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    /// Index drawn with probability proportional to `weights`.
    fn weighted(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut target = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            if target < *w {
                return i;
            }
            target -= w;
        }
        weights.len() - 1
    }
}

/// (code, name, base price, popularity)
const PROCEDURES: [(i64, &str, f64, f64); 10] = [
    (40304361, "Hemograma com contagem de plaquetas", 12.5, 20.0),
    (40302040, "Glicose", 4.1, 16.0),
    (40301630, "Creatinina", 4.3, 12.0),
    (40302580, "Ureia", 4.3, 11.0),
    (40302750, "Colesterol total", 4.6, 9.0),
    (40316521, "TSH - Hormônio tireoestimulante", 16.8, 7.0),
    (40311210, "Urina tipo I", 5.6, 8.0),
    (40302733, "Triglicerídeos", 5.3, 6.0),
    (40316491, "T4 livre", 15.4, 4.0),
    (40308391, "Cultura de urina", 14.9, 3.0),
];

const PROVIDERS: [&str; 3] = ["Laboratório Central", "Laboratório Norte", "Clínica São José"];
const USERS: [&str; 6] = [
    "Ana Souza",
    "Bruno Lima",
    "Carla Dias",
    "Diego Alves",
    "Elisa Rocha",
    "Fábio Nunes",
];
const UNITS: [&str; 4] = ["Pronto Atendimento", "Ambulatório", "Internação", "UTI"];
const CRITICALITY: [&str; 3] = ["Sem crítica", "Valor divergente", "Autorização pendente"];

fn main() {
    let mut rng = SimpleRng::new(42);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid start date");
    let popularity: Vec<f64> = PROCEDURES.iter().map(|p| p.3).collect();

    let rows = 5000;
    let mut requested: Vec<Option<i64>> = Vec::with_capacity(rows);
    let mut executed: Vec<Option<i64>> = Vec::with_capacity(rows);
    let mut authorization: Vec<String> = Vec::with_capacity(rows);
    let mut provider: Vec<&str> = Vec::with_capacity(rows);
    let mut user: Vec<&str> = Vec::with_capacity(rows);
    let mut unit: Vec<&str> = Vec::with_capacity(rows);
    let mut criticality: Vec<&str> = Vec::with_capacity(rows);
    let mut code: Vec<i64> = Vec::with_capacity(rows);
    let mut name: Vec<&str> = Vec::with_capacity(rows);
    let mut total_value: Vec<f64> = Vec::with_capacity(rows);
    let mut quantity: Vec<i64> = Vec::with_capacity(rows);

    for row in 0..rows {
        let day = start + Duration::days(rng.below(365) as i64);
        let request_ts = day
            .and_hms_opt(7 + rng.below(11) as u32, rng.below(60) as u32, 0)
            .expect("valid time");
        // A few requests never get executed.
        let execution_ts = if rng.next_f64() < 0.03 {
            None
        } else {
            Some(request_ts + Duration::hours(2 + rng.below(72) as i64))
        };

        let proc_idx = rng.weighted(&popularity);
        let (proc_code, proc_name, price, _) = PROCEDURES[proc_idx];
        let qty = 1 + (rng.next_f64() < 0.1) as i64;

        requested.push(Some(request_ts.and_utc().timestamp_millis()));
        executed.push(execution_ts.map(|t| t.and_utc().timestamp_millis()));
        authorization.push(format!("{}", 900_000 + row / 3));
        provider.push(PROVIDERS[rng.below(PROVIDERS.len())]);
        user.push(USERS[rng.below(USERS.len())]);
        unit.push(UNITS[rng.below(UNITS.len())]);
        criticality.push(CRITICALITY[rng.weighted(&[90.0, 7.0, 3.0])]);
        code.push(proc_code);
        name.push(proc_name);
        total_value.push(((price * qty as f64) * (0.9 + 0.2 * rng.next_f64()) * 100.0).round() / 100.0);
        quantity.push(qty);
    }

    let timestamp = DataType::Timestamp(TimeUnit::Millisecond, None);
    let schema = Arc::new(Schema::new(vec![
        Field::new("Data Requisição", timestamp.clone(), true),
        Field::new("Data Execução", timestamp, true),
        Field::new("Número Autorização", DataType::Utf8, false),
        Field::new("Prestador", DataType::Utf8, false),
        Field::new("Nome Usuário", DataType::Utf8, false),
        Field::new("Unidade Origem", DataType::Utf8, false),
        Field::new("Crítica", DataType::Utf8, false),
        Field::new("Código Procedimento", DataType::Int64, false),
        Field::new("NomeProcedimento", DataType::Utf8, false),
        Field::new("Valor Total", DataType::Float64, false),
        Field::new("Quantidade", DataType::Int64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMillisecondArray::from(requested)),
        Arc::new(TimestampMillisecondArray::from(executed)),
        Arc::new(StringArray::from(authorization)),
        Arc::new(StringArray::from(provider)),
        Arc::new(StringArray::from(user)),
        Arc::new(StringArray::from(unit)),
        Arc::new(StringArray::from(criticality)),
        Arc::new(Int64Array::from(code)),
        Arc::new(StringArray::from(name)),
        Arc::new(Float64Array::from(total_value)),
        Arc::new(Int64Array::from(quantity)),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns).expect("Failed to create RecordBatch");

    // Write Parquet
    let output_path = "sample_lab.parquet";
    let file = std::fs::File::create(output_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!("Wrote {rows} laboratory records to {output_path}");
}
