//! Hardcoded OPW parameters for a few robots, selectable by name from the
//! adapter configuration (`preset: irb2400_10`).

pub mod opw_kinematics {
    use crate::parameters::opw_kinematics::Parameters;
    use std::f64::consts::PI;

    impl Default for Parameters {
        fn default() -> Self {
            Parameters {
                a1: 0.0,
                a2: 0.0,
                b: 0.0,
                c1: 0.0,
                c2: 0.0,
                c3: 0.0,
                c4: 0.0,
                offsets: [0.0; 6],
                sign_corrections: [1; 6],
            }
        }
    }

    impl Parameters {
        /// Names accepted by [`Parameters::preset`].
        pub const PRESETS: [&'static str; 5] = [
            "irb2400_10", "kuka_kr6_r700_sixx", "staubli_tx2_140", "staubli_tx2_160", "fanuc_r2000ib_200r",
        ];

        /// Look up the named preset.
        pub fn preset(name: &str) -> Option<Self> {
            match name {
                "irb2400_10" => Some(Self::irb2400_10()),
                "kuka_kr6_r700_sixx" => Some(Self::kuka_kr6_r700_sixx()),
                "staubli_tx2_140" => Some(Self::staubli_tx2_140()),
                "staubli_tx2_160" => Some(Self::staubli_tx2_160()),
                "fanuc_r2000ib_200r" => Some(Self::fanuc_r2000ib_200r()),
                _ => None,
            }
        }

        pub fn irb2400_10() -> Self {
            Parameters {
                a1: 0.100,
                a2: -0.135,
                b: 0.000,
                c1: 0.615,
                c2: 0.705,
                c3: 0.755,
                c4: 0.085,
                offsets: [0.0, 0.0, -PI / 2.0, 0.0, 0.0, 0.0],
                ..Self::default()
            }
        }

        pub fn kuka_kr6_r700_sixx() -> Self {
            Parameters {
                a1: 0.025,
                a2: -0.035,
                b: 0.000,
                c1: 0.400,
                c2: 0.315,
                c3: 0.365,
                c4: 0.080,
                offsets: [0.0, -PI / 2.0, 0.0, 0.0, 0.0, 0.0],
                sign_corrections: [-1, 1, 1, -1, 1, -1],
            }
        }

        // Staubli TX2 arms share the plan and differ only in c2 and c3.
        fn staubli_tx2(c2: f64, c3: f64) -> Self {
            Parameters {
                a1: 0.150,
                c1: 0.550,
                c2,
                c3,
                c4: 0.110,
                ..Self::default()
            }
        }

        pub fn staubli_tx2_140() -> Self {
            Self::staubli_tx2(0.625, 0.625)
        }

        pub fn staubli_tx2_160() -> Self {
            Self::staubli_tx2(0.825, 0.625)
        }

        pub fn fanuc_r2000ib_200r() -> Self {
            Parameters {
                a1: 0.720,
                a2: -0.225,
                b: 0.000,
                c1: 0.600,
                c2: 1.075,
                c3: 1.280,
                c4: 0.235,
                offsets: [0.0, 0.0, -PI / 2.0, 0.0, 0.0, 0.0],
                ..Self::default()
            }
        }
    }

}
