//! Network resource definition.
//!
//! Declares the VPC stack for an environment: the VPC itself, one public
//! and one private subnet per availability zone, per-subnet route tables,
//! an internet gateway, an optional NAT gateway, the web and database
//! security groups, and the S3/DynamoDB gateway endpoints.
//!
//! Construction is pure: it reads the network parameters and returns a
//! template document. Availability zones are left as `Fn::GetAZs`
//! selections for the provisioning engine to resolve at deploy time.

use serde_json::json;

use crate::config::VpcConfig;
use crate::error::{Result, TemplateError};
use crate::template::{
    get_att, join, ref_to, select_az, sub, tag, Output, Resource, Template,
};

/// Subnet prefix length carved out of the VPC block.
const SUBNET_PREFIX: u8 = 24;

/// An IPv4 address block in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrBlock {
    /// Network address.
    network: u32,
    /// Prefix length.
    prefix: u8,
}

impl CidrBlock {
    /// Parses a CIDR block from a string like `10.0.0.0/16`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a well-formed network address.
    pub fn parse(s: &str) -> Result<Self> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| TemplateError::invalid_cidr(s, "expected ADDRESS/PREFIX"))?;

        let addr: std::net::Ipv4Addr = addr
            .parse()
            .map_err(|_| TemplateError::invalid_cidr(s, format!("invalid address '{addr}'")))?;

        let prefix: u8 = prefix
            .parse()
            .map_err(|_| TemplateError::invalid_cidr(s, format!("invalid prefix '{prefix}'")))?;

        if prefix > 32 {
            return Err(TemplateError::invalid_cidr(s, "prefix must be at most 32").into());
        }

        let network = u32::from(addr);
        let host_mask = if prefix == 32 { 0 } else { u32::MAX >> prefix };
        if network & host_mask != 0 {
            return Err(TemplateError::invalid_cidr(s, "host bits set in network address").into());
        }

        Ok(Self { network, prefix })
    }

    /// Number of /24 subnets this block can hold.
    #[must_use]
    pub const fn subnet_capacity(&self) -> usize {
        if self.prefix > SUBNET_PREFIX {
            0
        } else {
            1 << (SUBNET_PREFIX - self.prefix)
        }
    }

    /// Returns the `index`-th /24 subnet carved from this block.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::CidrExhausted`] if the block has no room
    /// for that many subnets.
    pub fn subnet(&self, index: usize) -> Result<String> {
        if index >= self.subnet_capacity() {
            return Err(TemplateError::CidrExhausted {
                cidr: self.to_string(),
                required: index + 1,
            }
            .into());
        }

        #[allow(clippy::cast_possible_truncation)]
        let addr = std::net::Ipv4Addr::from(self.network + ((index as u32) << 8));
        Ok(format!("{addr}/{SUBNET_PREFIX}"))
    }
}

impl std::fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", std::net::Ipv4Addr::from(self.network), self.prefix)
    }
}

/// Builder for the network stack of one environment.
#[derive(Debug)]
pub struct NetworkStack<'a> {
    /// Environment name.
    env_name: &'a str,
    /// Network parameters.
    config: &'a VpcConfig,
}

impl<'a> NetworkStack<'a> {
    /// Creates a network stack builder.
    #[must_use]
    pub const fn new(env_name: &'a str, config: &'a VpcConfig) -> Self {
        Self { env_name, config }
    }

    /// Synthesizes the VPC template for this environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured CIDR block is invalid or too
    /// small for the subnet plan.
    pub fn synthesize(&self) -> Result<Template> {
        let env = self.env_name;
        let cidr = CidrBlock::parse(&self.config.cidr)?;
        let azs = self.config.max_azs;

        let mut template = Template::new(format!("VPC infrastructure for {env} environment"));

        template.add_resource(
            "Vpc",
            Resource::new(
                "AWS::EC2::VPC",
                json!({
                    "CidrBlock": self.config.cidr,
                    "EnableDnsSupport": self.config.enable_dns_support,
                    "EnableDnsHostnames": self.config.enable_dns_hostnames,
                    "Tags": [tag("Name", format!("vpc-{env}"))],
                }),
            ),
        )?;

        template.add_resource(
            "InternetGateway",
            Resource::new(
                "AWS::EC2::InternetGateway",
                json!({ "Tags": [tag("Name", format!("igw-{env}"))] }),
            ),
        )?;

        template.add_resource(
            "VpcGatewayAttachment",
            Resource::new(
                "AWS::EC2::VPCGatewayAttachment",
                json!({
                    "VpcId": ref_to("Vpc"),
                    "InternetGatewayId": ref_to("InternetGateway"),
                }),
            ),
        )?;

        // Public tier takes the first block of /24s, private the next.
        self.add_subnet_tier(&mut template, &cidr, SubnetTier::Public, 0)?;
        if self.config.enable_nat_gateway {
            self.add_nat_gateway(&mut template)?;
        }
        self.add_subnet_tier(&mut template, &cidr, SubnetTier::Private, azs as usize)?;

        self.add_security_groups(&mut template)?;
        self.add_gateway_endpoints(&mut template)?;
        self.add_outputs(&mut template);

        Ok(template)
    }

    /// Declares one subnet per availability zone for a tier, with its
    /// route table, association, and default route.
    fn add_subnet_tier(
        &self,
        template: &mut Template,
        cidr: &CidrBlock,
        tier: SubnetTier,
        block_offset: usize,
    ) -> Result<()> {
        let env = self.env_name;

        for az in 0..self.config.max_azs {
            let n = az + 1;
            let subnet_id = format!("{}Subnet{n}", tier.logical_prefix());
            let table_id = format!("{}SubnetRouteTable{n}", tier.logical_prefix());
            let association_id = format!("{}SubnetRouteTableAssociation{n}", tier.logical_prefix());

            template.add_resource(
                &subnet_id,
                Resource::new(
                    "AWS::EC2::Subnet",
                    json!({
                        "VpcId": ref_to("Vpc"),
                        "CidrBlock": cidr.subnet(block_offset + az as usize)?,
                        "AvailabilityZone": select_az(az),
                        "MapPublicIpOnLaunch": (tier == SubnetTier::Public),
                        "Tags": [tag("Name", format!("{}-subnet-{env}-{n}", tier.name()))],
                    }),
                ),
            )?;

            template.add_resource(
                &table_id,
                Resource::new(
                    "AWS::EC2::RouteTable",
                    json!({
                        "VpcId": ref_to("Vpc"),
                        "Tags": [tag("Name", format!("{}-rt-{env}-{n}", tier.name()))],
                    }),
                ),
            )?;

            template.add_resource(
                &association_id,
                Resource::new(
                    "AWS::EC2::SubnetRouteTableAssociation",
                    json!({
                        "SubnetId": ref_to(&subnet_id),
                        "RouteTableId": ref_to(&table_id),
                    }),
                ),
            )?;

            match tier {
                SubnetTier::Public => {
                    template.add_resource(
                        format!("PublicSubnetDefaultRoute{n}"),
                        Resource::new(
                            "AWS::EC2::Route",
                            json!({
                                "RouteTableId": ref_to(&table_id),
                                "DestinationCidrBlock": "0.0.0.0/0",
                                "GatewayId": ref_to("InternetGateway"),
                            }),
                        )
                        .depends_on("VpcGatewayAttachment"),
                    )?;
                }
                SubnetTier::Private => {
                    // Without a NAT gateway the private tier is isolated:
                    // no default route is declared.
                    if self.config.enable_nat_gateway {
                        template.add_resource(
                            format!("PrivateSubnetDefaultRoute{n}"),
                            Resource::new(
                                "AWS::EC2::Route",
                                json!({
                                    "RouteTableId": ref_to(&table_id),
                                    "DestinationCidrBlock": "0.0.0.0/0",
                                    "NatGatewayId": ref_to("NatGateway"),
                                }),
                            ),
                        )?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Declares a single NAT gateway in the first public subnet, shared by
    /// all private route tables.
    fn add_nat_gateway(&self, template: &mut Template) -> Result<()> {
        let env = self.env_name;

        template.add_resource(
            "NatGatewayEip",
            Resource::new(
                "AWS::EC2::EIP",
                json!({
                    "Domain": "vpc",
                    "Tags": [tag("Name", format!("nat-eip-{env}"))],
                }),
            )
            .depends_on("VpcGatewayAttachment"),
        )?;

        template.add_resource(
            "NatGateway",
            Resource::new(
                "AWS::EC2::NatGateway",
                json!({
                    "AllocationId": get_att("NatGatewayEip", "AllocationId"),
                    "SubnetId": ref_to("PublicSubnet1"),
                    "Tags": [tag("Name", format!("nat-{env}"))],
                }),
            ),
        )?;

        Ok(())
    }

    /// Declares the web and database security groups with their fixed
    /// ingress rules.
    fn add_security_groups(&self, template: &mut Template) -> Result<()> {
        let env = self.env_name;

        template.add_resource(
            "WebSecurityGroup",
            Resource::new(
                "AWS::EC2::SecurityGroup",
                json!({
                    "GroupDescription": format!("Security group for web services in {env}"),
                    "VpcId": ref_to("Vpc"),
                    "SecurityGroupIngress": [
                        {
                            "IpProtocol": "tcp",
                            "FromPort": 80,
                            "ToPort": 80,
                            "CidrIp": "0.0.0.0/0",
                            "Description": "Allow HTTP traffic",
                        },
                        {
                            "IpProtocol": "tcp",
                            "FromPort": 443,
                            "ToPort": 443,
                            "CidrIp": "0.0.0.0/0",
                            "Description": "Allow HTTPS traffic",
                        },
                    ],
                    "Tags": [tag("Name", format!("web-sg-{env}"))],
                }),
            ),
        )?;

        template.add_resource(
            "DatabaseSecurityGroup",
            Resource::new(
                "AWS::EC2::SecurityGroup",
                json!({
                    "GroupDescription": format!("Security group for database services in {env}"),
                    "VpcId": ref_to("Vpc"),
                    "SecurityGroupIngress": [
                        {
                            "IpProtocol": "tcp",
                            "FromPort": 3306,
                            "ToPort": 3306,
                            "SourceSecurityGroupId": ref_to("WebSecurityGroup"),
                            "Description": "Allow MySQL access from web services",
                        },
                        {
                            "IpProtocol": "tcp",
                            "FromPort": 5432,
                            "ToPort": 5432,
                            "SourceSecurityGroupId": ref_to("WebSecurityGroup"),
                            "Description": "Allow PostgreSQL access from web services",
                        },
                    ],
                    "Tags": [tag("Name", format!("db-sg-{env}"))],
                }),
            ),
        )?;

        Ok(())
    }

    /// Declares the S3 and DynamoDB gateway endpoints, routed through the
    /// private route tables.
    fn add_gateway_endpoints(&self, template: &mut Template) -> Result<()> {
        let route_tables: Vec<_> = (1..=self.config.max_azs)
            .map(|n| ref_to(&format!("PrivateSubnetRouteTable{n}")))
            .collect();

        for (logical_id, service) in [
            ("S3GatewayEndpoint", "com.amazonaws.${AWS::Region}.s3"),
            ("DynamoDbGatewayEndpoint", "com.amazonaws.${AWS::Region}.dynamodb"),
        ] {
            template.add_resource(
                logical_id,
                Resource::new(
                    "AWS::EC2::VPCEndpoint",
                    json!({
                        "VpcId": ref_to("Vpc"),
                        "ServiceName": sub(service),
                        "VpcEndpointType": "Gateway",
                        "RouteTableIds": route_tables.clone(),
                    }),
                ),
            )?;
        }

        Ok(())
    }

    /// Declares the stack outputs surfaced after deployment.
    fn add_outputs(&self, template: &mut Template) {
        let env = self.env_name;
        let azs = self.config.max_azs;

        let subnet_refs = |prefix: &str| -> Vec<serde_json::Value> {
            (1..=azs).map(|n| ref_to(&format!("{prefix}Subnet{n}"))).collect()
        };

        template.add_output(
            "VpcId",
            Output::new(ref_to("Vpc"))
                .with_description(format!("VPC ID for {env} environment")),
        );
        template.add_output(
            "VpcCidr",
            Output::new(get_att("Vpc", "CidrBlock"))
                .with_description(format!("VPC CIDR block for {env} environment")),
        );
        template.add_output(
            "PublicSubnetIds",
            Output::new(join(",", subnet_refs("Public")))
                .with_description(format!("Public subnet IDs for {env} environment")),
        );
        template.add_output(
            "PrivateSubnetIds",
            Output::new(join(",", subnet_refs("Private")))
                .with_description(format!("Private subnet IDs for {env} environment")),
        );
        template.add_output(
            "WebSecurityGroupId",
            Output::new(ref_to("WebSecurityGroup"))
                .with_description(format!("Web security group ID for {env} environment")),
        );
        template.add_output(
            "DatabaseSecurityGroupId",
            Output::new(ref_to("DatabaseSecurityGroup"))
                .with_description(format!("Database security group ID for {env} environment")),
        );
    }
}

/// Subnet tiers declared by the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubnetTier {
    /// Routed to the internet gateway, public IPs on launch.
    Public,
    /// NAT-routed when a NAT gateway is enabled, isolated otherwise.
    Private,
}

impl SubnetTier {
    const fn logical_prefix(self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Private => "Private",
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vpc_config(cidr: &str, max_azs: u32, nat: bool) -> VpcConfig {
        VpcConfig {
            region: None,
            cidr: cidr.to_string(),
            max_azs,
            enable_nat_gateway: nat,
            enable_dns_hostnames: true,
            enable_dns_support: true,
        }
    }

    #[test]
    fn test_cidr_parse() {
        let block = CidrBlock::parse("10.0.0.0/16").unwrap();
        assert_eq!(block.to_string(), "10.0.0.0/16");
        assert_eq!(block.subnet_capacity(), 256);
    }

    #[test]
    fn test_cidr_parse_rejects_malformed() {
        assert!(CidrBlock::parse("10.0.0.0").is_err());
        assert!(CidrBlock::parse("10.0.0.0/33").is_err());
        assert!(CidrBlock::parse("256.0.0.0/16").is_err());
        assert!(CidrBlock::parse("10.0.0.1/16").is_err());
        assert!(CidrBlock::parse("10.0.0.0/abc").is_err());
    }

    #[test]
    fn test_cidr_subnet_allocation() {
        let block = CidrBlock::parse("10.0.0.0/16").unwrap();
        assert_eq!(block.subnet(0).unwrap(), "10.0.0.0/24");
        assert_eq!(block.subnet(1).unwrap(), "10.0.1.0/24");
        assert_eq!(block.subnet(3).unwrap(), "10.0.3.0/24");
        assert_eq!(block.subnet(255).unwrap(), "10.0.255.0/24");
        assert!(block.subnet(256).is_err());
    }

    #[test]
    fn test_cidr_small_block() {
        let block = CidrBlock::parse("192.168.4.0/23").unwrap();
        assert_eq!(block.subnet_capacity(), 2);
        assert_eq!(block.subnet(1).unwrap(), "192.168.5.0/24");
        let tiny = CidrBlock::parse("192.168.4.0/25").unwrap();
        assert_eq!(tiny.subnet_capacity(), 0);
    }

    #[test]
    fn test_development_example() {
        // CIDR 10.0.0.0/16, two zones, no NAT gateway.
        let config = vpc_config("10.0.0.0/16", 2, false);
        let template = NetworkStack::new("development", &config).synthesize().unwrap();

        assert_eq!(template.count_of_type("AWS::EC2::Subnet"), 4);
        assert_eq!(template.count_of_type("AWS::EC2::NatGateway"), 0);
        assert_eq!(template.count_of_type("AWS::EC2::EIP"), 0);
        assert_eq!(template.count_of_type("AWS::EC2::SecurityGroup"), 2);
        assert_eq!(template.count_of_type("AWS::EC2::VPCEndpoint"), 2);
        assert_eq!(template.count_of_type("AWS::EC2::VPC"), 1);

        // Isolated private tier: no default routes beyond the public ones.
        assert_eq!(template.count_of_type("AWS::EC2::Route"), 2);
    }

    #[test]
    fn test_subnet_count_scales_with_azs() {
        for azs in 1..=3 {
            let config = vpc_config("10.1.0.0/16", azs, true);
            let template = NetworkStack::new("staging", &config).synthesize().unwrap();
            assert_eq!(
                template.count_of_type("AWS::EC2::Subnet") as u32,
                azs * 2
            );
        }
    }

    #[test]
    fn test_nat_gateway_present_iff_enabled() {
        let without = NetworkStack::new("development", &vpc_config("10.0.0.0/16", 2, false))
            .synthesize()
            .unwrap();
        assert_eq!(without.count_of_type("AWS::EC2::NatGateway"), 0);

        let with = NetworkStack::new("production", &vpc_config("10.2.0.0/16", 2, true))
            .synthesize()
            .unwrap();
        assert_eq!(with.count_of_type("AWS::EC2::NatGateway"), 1);
        assert_eq!(with.count_of_type("AWS::EC2::EIP"), 1);
        // Private default routes point at the NAT gateway.
        let route = with.resource("PrivateSubnetDefaultRoute1").unwrap();
        assert_eq!(
            route.properties["NatGatewayId"],
            serde_json::json!({ "Ref": "NatGateway" })
        );
    }

    #[test]
    fn test_subnet_addressing() {
        let config = vpc_config("10.0.0.0/16", 2, false);
        let template = NetworkStack::new("development", &config).synthesize().unwrap();

        let cidr_of = |id: &str| template.resource(id).unwrap().properties["CidrBlock"].clone();
        assert_eq!(cidr_of("PublicSubnet1"), "10.0.0.0/24");
        assert_eq!(cidr_of("PublicSubnet2"), "10.0.1.0/24");
        assert_eq!(cidr_of("PrivateSubnet1"), "10.0.2.0/24");
        assert_eq!(cidr_of("PrivateSubnet2"), "10.0.3.0/24");
    }

    #[test]
    fn test_security_group_rules() {
        let config = vpc_config("10.0.0.0/16", 2, false);
        let template = NetworkStack::new("development", &config).synthesize().unwrap();

        let web = template.resource("WebSecurityGroup").unwrap();
        let ingress = web.properties["SecurityGroupIngress"].as_array().unwrap();
        let ports: Vec<i64> = ingress.iter().map(|r| r["FromPort"].as_i64().unwrap()).collect();
        assert_eq!(ports, vec![80, 443]);
        assert!(ingress.iter().all(|r| r["CidrIp"] == "0.0.0.0/0"));

        let db = template.resource("DatabaseSecurityGroup").unwrap();
        let ingress = db.properties["SecurityGroupIngress"].as_array().unwrap();
        let ports: Vec<i64> = ingress.iter().map(|r| r["FromPort"].as_i64().unwrap()).collect();
        assert_eq!(ports, vec![3306, 5432]);
        assert!(ingress
            .iter()
            .all(|r| r["SourceSecurityGroupId"] == serde_json::json!({ "Ref": "WebSecurityGroup" })));
    }

    #[test]
    fn test_gateway_endpoints_route_private_tables() {
        let config = vpc_config("10.0.0.0/16", 2, false);
        let template = NetworkStack::new("development", &config).synthesize().unwrap();

        let endpoint = template.resource("S3GatewayEndpoint").unwrap();
        let tables = endpoint.properties["RouteTableIds"].as_array().unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0], serde_json::json!({ "Ref": "PrivateSubnetRouteTable1" }));
    }

    #[test]
    fn test_outputs_declared() {
        let config = vpc_config("10.0.0.0/16", 2, false);
        let template = NetworkStack::new("development", &config).synthesize().unwrap();

        for name in [
            "VpcId",
            "VpcCidr",
            "PublicSubnetIds",
            "PrivateSubnetIds",
            "WebSecurityGroupId",
            "DatabaseSecurityGroupId",
        ] {
            assert!(template.outputs.contains_key(name), "missing output {name}");
        }
    }

    #[test]
    fn test_synthesis_idempotent() {
        let config = vpc_config("10.0.0.0/16", 2, false);
        let stack = NetworkStack::new("development", &config);
        let first = stack.synthesize().unwrap().to_json().unwrap();
        let second = stack.synthesize().unwrap().to_json().unwrap();
        assert_eq!(first, second);
    }
}
