//! IP address detector
//!
//! Lexical IPv4/IPv6 matching with hard suppression of the ranges that can
//! never leak anything: private, loopback, link-local, multicast,
//! documentation and benchmark space all score zero and are never emitted.

use super::context::{context_has_keyword, match_on_line, numbered_lines};
use super::{CandidateMatch, Detector, DetectorType, MatchSource};
use crate::config::ValidatorsConfig;
use crate::extract::ExtractedPayload;
use regex::Regex;
use std::net::{Ipv4Addr, Ipv6Addr};

const IP_KEYWORDS: &[&str] = &[
    "ip", "host", "server", "address", "dns", "gateway", "endpoint", "node", "peer",
];

pub struct IpAddressDetector {
    ipv4_re: Regex,
    ipv6_re: Regex,
}

impl IpAddressDetector {
    pub fn new() -> Self {
        Self {
            ipv4_re: Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap(),
            // Permissive shape; std's parser is the real validator.
            ipv6_re: Regex::new(r"(?:[0-9A-Fa-f]{0,4}:){2,7}[0-9A-Fa-f]{0,4}").unwrap(),
        }
    }
}

/// True when the address sits in a range that is suppressed outright.
pub fn ipv4_suppressed(addr: Ipv4Addr) -> bool {
    let octets = addr.octets();
    addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_multicast()
        || addr.is_broadcast()
        || addr.is_unspecified()
        // Documentation: 192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24
        || matches!(octets, [192, 0, 2, _] | [198, 51, 100, _] | [203, 0, 113, _])
        // Benchmark 198.18.0.0/15 and reserved 240.0.0.0/4
        || (octets[0] == 198 && (octets[1] == 18 || octets[1] == 19))
        || octets[0] >= 240
}

pub fn ipv6_suppressed(addr: Ipv6Addr) -> bool {
    let segments = addr.segments();
    addr.is_loopback()
        || addr.is_multicast()
        || addr.is_unspecified()
        // Link-local fe80::/10, unique-local fc00::/7
        || (segments[0] & 0xffc0) == 0xfe80
        || (segments[0] & 0xfe00) == 0xfc00
        // Documentation 2001:db8::/32
        || (segments[0] == 0x2001 && segments[1] == 0x0db8)
}

impl Default for IpAddressDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for IpAddressDetector {
    fn detector_type(&self) -> DetectorType {
        DetectorType::IpAddress
    }

    fn name(&self) -> &'static str {
        "ip_address"
    }

    fn configure(&mut self, _cfg: &ValidatorsConfig) {}

    fn validate(&self, payload: &ExtractedPayload) -> Vec<CandidateMatch> {
        let mut matches = Vec::new();
        for (line_number, line) in numbered_lines(&payload.body_text, 1) {
            for m in self.ipv4_re.find_iter(line) {
                let addr: Ipv4Addr = match m.as_str().parse() {
                    Ok(addr) => addr,
                    Err(_) => continue,
                };
                if ipv4_suppressed(addr) {
                    continue;
                }
                let mut candidate = match_on_line(
                    DetectorType::IpAddress,
                    line_number,
                    line,
                    m.start(),
                    m.end(),
                    70.0,
                    MatchSource::Body,
                );
                if context_has_keyword(&candidate, IP_KEYWORDS) {
                    candidate.confidence += 15.0;
                }
                candidate
                    .detector_meta
                    .push(("version".to_string(), "4".to_string()));
                candidate.clamp_confidence();
                matches.push(candidate);
            }

            for m in self.ipv6_re.find_iter(line) {
                let addr: Ipv6Addr = match m.as_str().parse() {
                    Ok(addr) => addr,
                    Err(_) => continue,
                };
                if ipv6_suppressed(addr) {
                    continue;
                }
                let mut candidate = match_on_line(
                    DetectorType::IpAddress,
                    line_number,
                    line,
                    m.start(),
                    m.end(),
                    70.0,
                    MatchSource::Body,
                );
                if context_has_keyword(&candidate, IP_KEYWORDS) {
                    candidate.confidence += 15.0;
                }
                candidate
                    .detector_meta
                    .push(("version".to_string(), "6".to_string()));
                candidate.clamp_confidence();
                matches.push(candidate);
            }
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractorId;
    use std::path::Path;

    fn payload(text: &str) -> ExtractedPayload {
        ExtractedPayload::empty(Path::new("hosts.txt"), ExtractorId::Plaintext)
            .with_text_stats(text.to_string())
    }

    #[test]
    fn test_private_ranges_suppressed() {
        assert!(ipv4_suppressed("10.0.0.4".parse().unwrap()));
        assert!(ipv4_suppressed("172.16.5.5".parse().unwrap()));
        assert!(ipv4_suppressed("192.168.1.1".parse().unwrap()));
        assert!(ipv4_suppressed("127.0.0.1".parse().unwrap()));
        assert!(ipv4_suppressed("169.254.0.9".parse().unwrap()));
        assert!(ipv4_suppressed("224.0.0.1".parse().unwrap()));
        assert!(ipv4_suppressed("192.0.2.55".parse().unwrap()));
        assert!(ipv4_suppressed("198.51.100.7".parse().unwrap()));
        assert!(ipv4_suppressed("203.0.113.9".parse().unwrap()));
        assert!(ipv4_suppressed("198.18.0.1".parse().unwrap()));
        assert!(!ipv4_suppressed("8.8.8.8".parse().unwrap()));
        assert!(!ipv4_suppressed("52.94.12.1".parse().unwrap()));
    }

    #[test]
    fn test_ipv6_ranges_suppressed() {
        assert!(ipv6_suppressed("::1".parse().unwrap()));
        assert!(ipv6_suppressed("fe80::1".parse().unwrap()));
        assert!(ipv6_suppressed("fc00::5".parse().unwrap()));
        assert!(ipv6_suppressed("ff02::1".parse().unwrap()));
        assert!(ipv6_suppressed("2001:db8::1".parse().unwrap()));
        assert!(!ipv6_suppressed("2606:4700:4700::1111".parse().unwrap()));
    }

    #[test]
    fn test_only_public_addresses_emitted() {
        let detector = IpAddressDetector::new();
        let matches = detector.validate(&payload(
            "host 10.0.0.4\ngw 192.168.1.1\ndns 8.8.8.8\n",
        ));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].match_text, "8.8.8.8");
        assert_eq!(matches[0].line_number, 3);
    }

    #[test]
    fn test_not_an_address() {
        let detector = IpAddressDetector::new();
        assert!(detector.validate(&payload("version 300.1.2.999 is not an ip\n")).is_empty());
    }
}
